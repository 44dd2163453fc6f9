//! Linux port detection via the kernel socket table.
//!
//! Reads `/proc/net/tcp` for (port, socket inode) pairs, then maps each
//! inode back to its owning process by walking every process's open file
//! descriptors. The reverse walk is O(processes x fds), so it runs once per
//! scan to build an inode->pid index instead of once per socket row.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{PortRecord, ScanStrategy, UNKNOWN_PROCESS};
use crate::error::ScanError;

/// Scans ports by reading the kernel TCP socket table under `proc_root`.
pub struct LinuxStrategy {
    proc_root: PathBuf,
}

impl LinuxStrategy {
    /// Scanner over the real `/proc`.
    pub fn new() -> Self {
        Self::with_proc_root("/proc")
    }

    /// Scanner over an arbitrary proc-like tree. Tests point this at a
    /// synthetic directory.
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }
}

impl Default for LinuxStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanStrategy for LinuxStrategy {
    fn scan(&self) -> Result<Vec<PortRecord>, ScanError> {
        let table_path = self.proc_root.join("net").join("tcp");
        let table =
            fs::read_to_string(&table_path).map_err(|source| ScanError::SourceUnavailable {
                path: table_path.clone(),
                source,
            })?;

        let index = InodeIndex::build(&self.proc_root);
        let records = parse_socket_table(&table, &index);
        log::debug!(
            "linux scan: {} socket rows resolved against {} indexed inodes",
            records.len(),
            index.len()
        );
        Ok(records)
    }
}

/// Parses the socket table text, one record per well-formed row.
///
/// The header line is skipped. Rows with fewer than 10 fields or an
/// unparsable local port are dropped silently; an unresolvable inode
/// degrades the row to `"unknown"` rather than dropping it. Duplicate ports
/// (same port, distinct inodes) are kept as-is.
fn parse_socket_table(table: &str, index: &InodeIndex) -> Vec<PortRecord> {
    let mut records = Vec::new();

    for line in table.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }

        let Some(port) = local_port(fields[1]) else {
            continue;
        };

        let inode = fields[9];
        records.push(PortRecord {
            port,
            process: index.resolve(inode),
        });
    }

    records
}

/// Extracts the port from a `hex-ip:hex-port` local-address field.
fn local_port(local_address: &str) -> Option<u16> {
    let (_, hex_port) = local_address.split_once(':')?;
    u16::from_str_radix(hex_port, 16).ok()
}

/// Socket-inode to pid index, built once per scan by walking every
/// process's fd directory.
struct InodeIndex {
    proc_root: PathBuf,
    inode_to_pid: HashMap<String, u32>,
}

impl InodeIndex {
    fn build(proc_root: &Path) -> Self {
        let mut pids = Vec::new();
        if let Ok(entries) = fs::read_dir(proc_root) {
            for entry in entries.flatten() {
                if let Ok(pid) = entry.file_name().to_string_lossy().parse::<u32>() {
                    pids.push(pid);
                }
            }
        }
        // Ascending pid order makes the first-match winner deterministic
        // when two processes share a socket inode.
        pids.sort_unstable();

        let mut inode_to_pid = HashMap::new();
        for pid in pids {
            let fd_dir = proc_root.join(pid.to_string()).join("fd");
            // Permission errors on another user's fd directory mean "no
            // match for that process", never a scan failure.
            let Ok(fds) = fs::read_dir(&fd_dir) else {
                continue;
            };

            for fd in fds.flatten() {
                let Ok(target) = fs::read_link(fd.path()) else {
                    continue;
                };
                if let Some(inode) = socket_inode(&target.to_string_lossy()) {
                    inode_to_pid.entry(inode.to_string()).or_insert(pid);
                }
            }
        }

        Self {
            proc_root: proc_root.to_path_buf(),
            inode_to_pid,
        }
    }

    fn len(&self) -> usize {
        self.inode_to_pid.len()
    }

    /// Resolves a socket inode to a process name, or `"unknown"` if no
    /// process holds it or its command line cannot be read.
    fn resolve(&self, inode: &str) -> String {
        self.inode_to_pid
            .get(inode)
            .and_then(|&pid| process_name(&self.proc_root, pid))
            .unwrap_or_else(|| UNKNOWN_PROCESS.to_string())
    }
}

/// Extracts the inode from an fd symlink target of the form
/// `socket:[<inode>]`.
fn socket_inode(link_target: &str) -> Option<&str> {
    link_target
        .strip_prefix("socket:[")
        .and_then(|rest| rest.strip_suffix(']'))
}

/// Reads a process's executable name from its NUL-delimited command line:
/// first argument, final path component.
fn process_name(proc_root: &Path, pid: u32) -> Option<String> {
    let cmdline = fs::read(proc_root.join(pid.to_string()).join("cmdline")).ok()?;
    let first_arg = cmdline.split(|&b| b == 0).next()?;
    let first_arg = String::from_utf8_lossy(first_arg);

    let name = Path::new(first_arg.as_ref()).file_name()?.to_string_lossy();
    if name.is_empty() {
        None
    } else {
        Some(name.into_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::symlink;

    use tempfile::TempDir;

    use super::*;

    const TABLE_HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";

    /// One well-formed socket table row with the given local port (hex) and
    /// inode.
    fn table_row(hex_port: &str, inode: &str) -> String {
        format!(
            "   0: 00000000:{hex_port} 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 {inode} 1 0000000000000000 100 0 0 10 0"
        )
    }

    fn write_table(root: &Path, rows: &[String]) {
        let net = root.join("net");
        fs::create_dir_all(&net).unwrap();
        let mut table = String::from(TABLE_HEADER);
        for row in rows {
            table.push('\n');
            table.push_str(row);
        }
        table.push('\n');
        fs::write(net.join("tcp"), table).unwrap();
    }

    /// Gives `pid` an fd symlink to `socket:[inode]` and the given cmdline.
    fn write_process(root: &Path, pid: u32, fd: u32, inode: &str, cmdline: &[u8]) {
        let proc_dir = root.join(pid.to_string());
        let fd_dir = proc_dir.join("fd");
        fs::create_dir_all(&fd_dir).unwrap();
        symlink(format!("socket:[{inode}]"), fd_dir.join(fd.to_string())).unwrap();
        fs::write(proc_dir.join("cmdline"), cmdline).unwrap();
    }

    #[test]
    fn test_local_port_hex_decode() {
        assert_eq!(local_port("00000000:1F90"), Some(8080));
        assert_eq!(local_port("0100007F:0050"), Some(80));
        assert_eq!(local_port("00000000:FFFF"), Some(65535));
    }

    #[test]
    fn test_local_port_rejects_malformed_field() {
        assert_eq!(local_port("00000000"), None);
        assert_eq!(local_port("00000000:ZZZZ"), None);
        assert_eq!(local_port(""), None);
    }

    #[test]
    fn test_socket_inode_pattern() {
        assert_eq!(socket_inode("socket:[1234]"), Some("1234"));
        assert_eq!(socket_inode("pipe:[1234]"), None);
        assert_eq!(socket_inode("/dev/null"), None);
    }

    #[test]
    fn test_end_to_end_resolves_nginx() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_table(root, &[table_row("0050", "1234")]);
        write_process(root, 42, 3, "1234", b"/usr/bin/nginx\0-g\0daemon off;\0");

        let records = LinuxStrategy::with_proc_root(root).scan().unwrap();
        assert_eq!(
            records,
            vec![PortRecord {
                port: 80,
                process: "nginx".to_string(),
            }]
        );
    }

    #[test]
    fn test_unresolved_inode_degrades_to_unknown() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_table(root, &[table_row("1F90", "999")]);

        let records = LinuxStrategy::with_proc_root(root).scan().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].port, 8080);
        assert_eq!(records[0].process, UNKNOWN_PROCESS);
    }

    #[test]
    fn test_short_and_malformed_lines_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_table(
            root,
            &[
                "   0: too few fields".to_string(),
                table_row("XYZ!", "77"),
                table_row("0050", "1234"),
            ],
        );
        write_process(root, 42, 3, "1234", b"/usr/bin/nginx\0");

        let records = LinuxStrategy::with_proc_root(root).scan().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].port, 80);
    }

    #[test]
    fn test_duplicate_ports_are_kept() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_table(root, &[table_row("0050", "10"), table_row("0050", "11")]);

        let records = LinuxStrategy::with_proc_root(root).scan().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.port == 80));
    }

    #[test]
    fn test_lowest_pid_wins_shared_inode() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_table(root, &[table_row("0050", "500")]);
        // Lexicographically "200" sorts before "30"; numeric pid order must
        // still pick 30.
        write_process(root, 200, 4, "500", b"/usr/bin/worker\0");
        write_process(root, 30, 4, "500", b"/usr/bin/parent\0");

        let records = LinuxStrategy::with_proc_root(root).scan().unwrap();
        assert_eq!(records[0].process, "parent");
    }

    #[test]
    fn test_empty_cmdline_degrades_to_unknown() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_table(root, &[table_row("0050", "1234")]);
        write_process(root, 42, 3, "1234", b"");

        let records = LinuxStrategy::with_proc_root(root).scan().unwrap();
        assert_eq!(records[0].process, UNKNOWN_PROCESS);
    }

    #[test]
    fn test_missing_table_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = LinuxStrategy::with_proc_root(tmp.path()).scan().unwrap_err();
        assert!(matches!(err, ScanError::SourceUnavailable { .. }));
    }
}
