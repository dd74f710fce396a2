use shipsync::ui::output;

fn main() {
    if let Err(err) = shipsync::cli::run() {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}
