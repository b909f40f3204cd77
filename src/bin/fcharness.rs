use anyhow::Result;

fn main() -> Result<()> {
    fcharness::cli::run()
}
