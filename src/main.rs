fn main() {
    if let Err(err) = csv_bind::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
