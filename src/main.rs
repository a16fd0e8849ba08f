fn main() {
    if let Err(err) = census_tables::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
