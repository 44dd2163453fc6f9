//! Windows port detection via `netstat` and `tasklist` output.
//!
//! `netstat -ano` yields (port, owning pid) pairs; each distinct port's pid
//! is resolved to a process name with one `tasklist` invocation. Parsing is
//! kept apart from subprocess spawning so the table and CSV parsers are
//! testable from fixture text on any host.

use std::collections::HashMap;
use std::process::Command;

use super::{PortRecord, ScanStrategy, UNKNOWN_PROCESS};
use crate::error::ScanError;

/// Scans ports by parsing the system network-statistics tool.
pub struct WindowsStrategy;

impl WindowsStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanStrategy for WindowsStrategy {
    fn scan(&self) -> Result<Vec<PortRecord>, ScanError> {
        let output = Command::new("netstat")
            .arg("-ano")
            .output()
            .map_err(|e| ScanError::ToolFailed {
                tool: "netstat",
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ScanError::ToolFailed {
                tool: "netstat",
                reason: format!("exited with {}", output.status),
            });
        }

        let table = String::from_utf8_lossy(&output.stdout);
        let records = collect_tcp_ports(&table, resolve_pid);
        log::debug!("windows scan: {} distinct ports", records.len());
        Ok(records)
    }
}

/// Parses netstat table text into deduplicated port records.
///
/// Lines with fewer than 5 fields or a first field other than `TCP` are
/// skipped, as are lines whose local-address port segment does not parse.
/// The first row seen for a port wins; later rows for the same port (e.g.
/// LISTENING plus ESTABLISHED duplicates) trigger no further resolution.
fn collect_tcp_ports<F>(table: &str, mut resolve: F) -> Vec<PortRecord>
where
    F: FnMut(&str) -> String,
{
    let mut by_port: HashMap<u16, String> = HashMap::new();

    for line in table.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 || fields[0] != "TCP" {
            continue;
        }

        let Some(port) = local_port(fields[1]) else {
            continue;
        };

        // Last field is the owning pid.
        let pid = fields[fields.len() - 1];
        if !by_port.contains_key(&port) {
            by_port.insert(port, resolve(pid));
        }
    }

    by_port
        .into_iter()
        .map(|(port, process)| PortRecord { port, process })
        .collect()
}

/// Extracts the port from a local-address field. The address part may itself
/// contain colons (IPv6), so the port is always the final colon-delimited
/// segment.
fn local_port(local_address: &str) -> Option<u16> {
    let (_, port) = local_address.rsplit_once(':')?;
    port.parse().ok()
}

/// Resolves a pid to its process name via the system task-listing tool,
/// returning `"unknown"` on any failure.
fn resolve_pid(pid: &str) -> String {
    let output = Command::new("tasklist")
        .args(["/FI", &format!("PID eq {pid}"), "/FO", "CSV", "/NH"])
        .output();

    let output = match output {
        Ok(output) if output.status.success() => output,
        _ => return UNKNOWN_PROCESS.to_string(),
    };

    parse_tasklist_record(&String::from_utf8_lossy(&output.stdout))
}

/// Extracts the process name from a CSV tasklist record: first line, first
/// comma-separated field, surrounding quotes stripped.
fn parse_tasklist_record(output: &str) -> String {
    let line = output.trim();
    if line.is_empty() {
        return UNKNOWN_PROCESS.to_string();
    }

    match line.lines().next().and_then(|l| l.split(',').next()) {
        Some(name) => name.trim_matches('"').to_string(),
        None => UNKNOWN_PROCESS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETSTAT_FIXTURE: &str = "\
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       948
  TCP    0.0.0.0:445            0.0.0.0:0              LISTENING       4
  TCP    192.168.1.10:445       192.168.1.20:51234     ESTABLISHED     9999
  TCP    [::]:3389              [::]:0                 LISTENING       1204
  UDP    0.0.0.0:5353           *:*                                    2288
";

    #[test]
    fn test_non_tcp_lines_excluded() {
        let records = collect_tcp_ports(NETSTAT_FIXTURE, |pid| format!("proc-{pid}"));
        assert!(records.iter().all(|r| r.port != 5353));
    }

    #[test]
    fn test_first_seen_port_wins() {
        let mut resolved = Vec::new();
        let records = collect_tcp_ports(NETSTAT_FIXTURE, |pid| {
            resolved.push(pid.to_string());
            format!("proc-{pid}")
        });

        let port_445: Vec<_> = records.iter().filter(|r| r.port == 445).collect();
        assert_eq!(port_445.len(), 1);
        assert_eq!(port_445[0].process, "proc-4");
        // The ESTABLISHED duplicate for port 445 never reaches the resolver.
        assert!(!resolved.contains(&"9999".to_string()));
    }

    #[test]
    fn test_ipv6_port_is_final_segment() {
        let records = collect_tcp_ports(NETSTAT_FIXTURE, |_| "svc".to_string());
        assert!(records.iter().any(|r| r.port == 3389));
    }

    #[test]
    fn test_short_and_headerish_lines_skipped() {
        let table = "Active Connections\n  Proto  Local Address\n  TCP    nocolon    0.0.0.0:0    LISTENING    17\n";
        assert!(collect_tcp_ports(table, |_| "x".to_string()).is_empty());
    }

    #[test]
    fn test_unparsable_port_skipped() {
        let table = "  TCP    0.0.0.0:notaport    0.0.0.0:0    LISTENING    17\n";
        assert!(collect_tcp_ports(table, |_| "x".to_string()).is_empty());
    }

    #[test]
    fn test_tasklist_record_parsing() {
        assert_eq!(
            parse_tasklist_record("\"svchost.exe\",\"948\",\"Services\",\"0\",\"9,500 K\"\r\n"),
            "svchost.exe"
        );
        assert_eq!(parse_tasklist_record(""), UNKNOWN_PROCESS);
        assert_eq!(parse_tasklist_record("   \r\n"), UNKNOWN_PROCESS);
        assert_eq!(parse_tasklist_record("unquoted,1"), "unquoted");
    }
}
