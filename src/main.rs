fn main() {
    databind::cli::run();
}
