use std::process;
use trun::ui;

fn main() {
    if let Err(e) = trun::cli::run() {
        eprintln!("{}", ui::failure(&format!("Error: {:#}", e)));
        process::exit(1);
    }
}
