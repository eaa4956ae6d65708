fn main() {
    if let Err(err) = pomodoro_lib::run() {
        eprintln!("pomodoro: {err:#}");
        std::process::exit(1);
    }
}
