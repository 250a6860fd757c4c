fn main() {
    if let Err(err) = supply_chain_intake::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
