fn main() -> anyhow::Result<()> {
    rsvpreader_lib::run()
}
