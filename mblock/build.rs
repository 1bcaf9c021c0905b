fn main() {
    // Prevent warnings when checking for flag `mblock_loom`.
    println!("cargo::rustc-check-cfg=cfg(mblock_loom)");
}
