fn main() {
    if let Err(err) = storyview_lib::run() {
        eprintln!("storyview: {err:#}");
        std::process::exit(1);
    }
}
