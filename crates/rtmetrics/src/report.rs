//! Human-readable rendering of frames.

use rtmetrics_core::RealtimeMetrics;

/// Format byte count as human-readable size: `"1.5G"`, `"100.3M"`, `"512B"`.
pub fn format_bytes(bytes: u64) -> String {
    let f = bytes as f64;
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1}G", f / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1}M", f / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1}K", f / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

/// One-line summary of a frame: host count, categories, and a headline
/// figure for each category that has one.
pub fn frame_line(frame: &RealtimeMetrics) -> String {
    let m = &frame.aggregated;
    let mut parts = vec![
        format!("hosts={}", frame.hosts.len()),
        format!("types={}", m.types()),
    ];

    if let Some(cpu) = &m.cpu {
        parts.push(format!("cpus={}", cpu.cpu_count));
        if let Some(load) = &cpu.load_stat {
            parts.push(format!("load1={:.2}", load.load1));
        }
    }
    if let Some(mem) = &m.mem {
        parts.push(format!(
            "mem={}/{}",
            format_bytes(mem.info.used),
            format_bytes(mem.info.total)
        ));
    }
    if let Some(disk) = &m.disk {
        parts.push(format!("disks={}", disk.n_disks));
        if disk.offline > 0 {
            parts.push(format!("offline={}", disk.offline));
        }
        if disk.healing > 0 {
            parts.push(format!("healing={}", disk.healing));
        }
    }
    if let Some(net) = &m.net {
        parts.push(format!(
            "rx={} tx={}",
            format_bytes(net.net_stats.rx_bytes),
            format_bytes(net.net_stats.tx_bytes)
        ));
    }
    if let Some(scanner) = &m.scanner {
        parts.push(format!("scan.cycle={}", scanner.current_cycle));
    }
    if let Some(rpc) = &m.rpc {
        parts.push(format!("rpc.connected={}", rpc.connected));
    }
    if !frame.errors.is_empty() {
        parts.push(format!("errors={}", frame.errors.len()));
    }
    if frame.is_final {
        parts.push("final".to_string());
    }
    parts.join(" ")
}
