fn main() {
    if let Err(err) = imprimatur::main() {
        eprintln!("Error: {}", err);

        for cause in err.iter_causes() {
            eprintln!("Caused by: {}", cause);
        }

        std::process::exit(1);
    }
}
