fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // libFuzzer targets are only built and run on Linux
    #[cfg(target_os = "linux")]
    println!("cargo:rustc-cfg=fuzzing");

    #[cfg(not(target_os = "linux"))]
    eprintln!("Note: the marquee fuzz targets run on Linux only; use a Linux container elsewhere.");
}
