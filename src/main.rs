use pulse_pipeline::app;

fn main() -> anyhow::Result<()> {
    app::main()
}
