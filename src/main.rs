fn main() {
    if let Err(e) = super_capt_lib::run() {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
