// End-to-end runs of the demo firmware on the simulated board

use std::time::Duration;

use s32sim::shared::config::SimConfig;
use s32sim::simulator::trace::{CSV_FILE, JSONL_FILE};
use s32sim::simulator::{Board, Simulator};

fn config_with_output(dir: &std::path::Path) -> SimConfig {
    let mut config = SimConfig::default();
    config.simulation.output_dir = dir.display().to_string();
    config
}

#[test]
fn test_five_seconds_of_firmware() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_output(dir.path());
    let report = s32sim::run_simulated(&config).unwrap();

    // can_tx at 0, 1000, .., 5000
    assert_eq!(report.trace_events, 6);
    assert_eq!(report.stats.sim_time_ms, 5000);
    // uart 11, can_tx 6, can_rx 26
    assert_eq!(report.stats.task_polls, 43);

    let console = &report.console;
    assert_eq!(console.matches("UART Task running...\r\n").count(), 11);
    assert!(console.contains("CAN0 sent frame: 00 01 \r\n"));
    assert!(console.contains("CAN0 sent frame: 0A 0B \r\n"));
    assert!(console.contains("Received CAN1 frame: ID=123 Data=0A 0B \r\n"));
    assert!(console.contains("CAN1 Task: frame received count=6\r\n"));
    assert!(!console.contains("count=7"));

    let csv = std::fs::read_to_string(dir.path().join(CSV_FILE)).unwrap();
    assert_eq!(csv.lines().count(), 7);
    assert!(csv.starts_with("seq,time_us,node,id,dlc,data"));
    let jsonl = std::fs::read_to_string(dir.path().join(JSONL_FILE)).unwrap();
    assert_eq!(jsonl.lines().count(), 6);
}

#[test]
fn test_console_on_another_lpuart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with_output(dir.path());
    config.lpuart.console = 2;
    config.simulation.duration_ms = 0;

    let board = Board::boot(&config).unwrap();
    let mut sim = Simulator::new(board, &config);
    sim.run_until(Duration::ZERO);
    let soc = sim.board().soc();
    assert!(soc.uart_output(0).unwrap().is_empty());
    assert!(soc.uart_output(2).unwrap().to_string_lossy().starts_with("UART Task running..."));
}

#[test]
fn test_extended_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_with_output(dir.path());
    config.tasks.can_tx_id = 0x1ABC_DEF0;
    config.simulation.duration_ms = 10;
    let report = s32sim::run_simulated(&config).unwrap();
    assert!(report.console.contains("Received CAN1 frame: ID=1ABCDEF0 Data=00 01 \r\n"));
}

#[test]
fn test_invalid_configuration_fails_boot() {
    let mut config = SimConfig::default();
    config.flexcan.count = 1;
    assert!(Board::boot(&config).is_err());
    assert!(s32sim::run_simulated(&config).is_err());
}
