fn main() {
    if let Err(err) = bom_reconcile::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
