fn main() {
    if let Err(e) = healthvault_lib::run() {
        eprintln!("healthvault: {e}");
        std::process::exit(1);
    }
}
