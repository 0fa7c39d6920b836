use scout::{cli, output, router};

fn main() {
    let cli = cli::parse();
    if let Err(err) = router::dispatch(cli) {
        output::print_error(&err);
        std::process::exit(err.exit_code());
    }
}
