use which::which;

/// Building this crate has an undeclared dependency on the `bpf-linker` binary. Cargo can't
/// express that yet, so rebuild whenever the `bpf-linker` found on $PATH changes.
fn main() {
    let bpf_linker = which("bpf-linker").unwrap();
    println!("cargo:rerun-if-changed={}", bpf_linker.to_str().unwrap());
}
