fn main() -> Result<(), Box<dyn std::error::Error>> {
    cardchat::cli::main()
}
