fn main() {
    if let Err(err) = csv_valuetypes::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
