fn main() {
    println!("cargo:rerun-if-env-changed=COLDTRACE_CONFIG");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
