fn main() {
    fleet_telemetry::cli::run();
}
