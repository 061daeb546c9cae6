fn main() -> anyhow::Result<()> {
    medreminder_lib::run()
}
