//! Main entry point for CLI command to start the server.

fn main() -> anyhow::Result<()> {
    library_graph::main()
}
