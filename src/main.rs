fn main() -> anyhow::Result<()> {
    todo_sync::cli::run()
}
