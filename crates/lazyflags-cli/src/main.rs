fn main() {
    if let Err(error) = lazyflags_cli::run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
