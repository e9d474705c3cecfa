//! Built-in command table.
//!
//! Each row names a command in every dialect that has an equivalent and
//! lists flag equivalences as `(unix, powershell, cmd)`. `Some("")` drops the
//! flag in that dialect, `None` means there is no equivalent.

use super::{BidirectionalMapping, FlagSpec};

type FlagRow = (&'static str, Option<&'static str>, Option<&'static str>);

struct Seed {
    unix: &'static str,
    powershell: Option<&'static str>,
    cmd: Option<&'static str>,
    requires_arguments: bool,
    flags: &'static [FlagRow],
}

const DROP: Option<&str> = Some("");

static SEEDS: &[Seed] = &[
    Seed {
        unix: "ls",
        powershell: Some("Get-ChildItem"),
        cmd: Some("dir"),
        requires_arguments: false,
        flags: &[
            ("-l", DROP, DROP),
            ("-a", Some("-Force"), Some("/A")),
            ("-A", Some("-Force"), Some("/A")),
            ("-R", Some("-Recurse"), Some("/S")),
            ("-1", Some("-Name"), Some("/B")),
            ("-h", DROP, DROP),
            ("--all", Some("-Force"), Some("/A")),
            ("--recursive", Some("-Recurse"), Some("/S")),
        ],
    },
    Seed {
        unix: "rm",
        powershell: Some("Remove-Item"),
        cmd: Some("del"),
        requires_arguments: true,
        flags: &[
            ("-r", Some("-Recurse"), Some("/S")),
            ("-R", Some("-Recurse"), Some("/S")),
            ("-f", Some("-Force"), Some("/F")),
            ("-i", Some("-Confirm"), Some("/P")),
            ("-v", Some("-Verbose"), None),
            ("--recursive", Some("-Recurse"), Some("/S")),
            ("--force", Some("-Force"), Some("/F")),
        ],
    },
    Seed {
        unix: "rmdir",
        powershell: Some("Remove-Item"),
        cmd: Some("rmdir"),
        requires_arguments: true,
        flags: &[("-v", Some("-Verbose"), None)],
    },
    Seed {
        unix: "cp",
        powershell: Some("Copy-Item"),
        cmd: Some("copy"),
        requires_arguments: true,
        flags: &[
            ("-r", Some("-Recurse"), None),
            ("-R", Some("-Recurse"), None),
            ("-f", Some("-Force"), Some("/Y")),
            ("-v", Some("-Verbose"), None),
            ("-i", Some("-Confirm"), None),
            ("--recursive", Some("-Recurse"), None),
        ],
    },
    Seed {
        unix: "mv",
        powershell: Some("Move-Item"),
        cmd: Some("move"),
        requires_arguments: true,
        flags: &[
            ("-f", Some("-Force"), Some("/Y")),
            ("-v", Some("-Verbose"), None),
            ("-i", Some("-Confirm"), None),
        ],
    },
    Seed {
        unix: "mkdir",
        powershell: Some("New-Item -ItemType Directory"),
        cmd: Some("mkdir"),
        requires_arguments: true,
        flags: &[
            ("-p", Some("-Force"), DROP),
            ("--parents", Some("-Force"), DROP),
            ("-v", Some("-Verbose"), None),
        ],
    },
    Seed {
        unix: "touch",
        powershell: Some("New-Item -ItemType File"),
        cmd: Some("type nul >"),
        requires_arguments: true,
        flags: &[],
    },
    Seed {
        unix: "cat",
        powershell: Some("Get-Content"),
        cmd: Some("type"),
        requires_arguments: true,
        flags: &[],
    },
    Seed {
        unix: "cd",
        powershell: Some("Set-Location"),
        cmd: Some("cd"),
        requires_arguments: false,
        flags: &[],
    },
    // After `cd`: the first registration of the cmd `cd` spelling wins
    Seed {
        unix: "pwd",
        powershell: Some("Get-Location"),
        cmd: Some("cd"),
        requires_arguments: false,
        flags: &[("-L", DROP, DROP), ("-P", DROP, DROP)],
    },
    Seed {
        unix: "clear",
        powershell: Some("Clear-Host"),
        cmd: Some("cls"),
        requires_arguments: false,
        flags: &[],
    },
    Seed {
        unix: "grep",
        powershell: Some("Select-String"),
        cmd: Some("findstr"),
        requires_arguments: true,
        flags: &[
            ("-i", DROP, Some("/I")),
            ("-v", Some("-NotMatch"), Some("/V")),
            ("-n", DROP, Some("/N")),
            ("-F", Some("-SimpleMatch"), Some("/L")),
            ("-E", DROP, Some("/R")),
            ("-r", None, Some("/S")),
            ("-q", Some("-Quiet"), None),
            ("--ignore-case", DROP, Some("/I")),
            ("--invert-match", Some("-NotMatch"), Some("/V")),
        ],
    },
    Seed {
        unix: "which",
        powershell: Some("Get-Command"),
        cmd: Some("where"),
        requires_arguments: true,
        flags: &[("-a", Some("-All"), DROP)],
    },
    Seed {
        unix: "sort",
        powershell: Some("Sort-Object"),
        cmd: Some("sort"),
        requires_arguments: false,
        flags: &[
            ("-r", Some("-Descending"), Some("/R")),
            ("-u", Some("-Unique"), None),
            ("--reverse", Some("-Descending"), Some("/R")),
        ],
    },
    Seed {
        unix: "uniq",
        powershell: Some("Get-Unique"),
        cmd: None,
        requires_arguments: false,
        flags: &[],
    },
    Seed {
        unix: "wc",
        powershell: Some("Measure-Object"),
        cmd: None,
        requires_arguments: false,
        flags: &[
            ("-l", Some("-Line"), None),
            ("-w", Some("-Word"), None),
            ("-c", Some("-Character"), None),
            ("-m", Some("-Character"), None),
            ("--lines", Some("-Line"), None),
            ("--words", Some("-Word"), None),
        ],
    },
    Seed {
        unix: "ps",
        powershell: Some("Get-Process"),
        cmd: Some("tasklist"),
        requires_arguments: false,
        flags: &[
            ("-e", DROP, DROP),
            ("-A", DROP, DROP),
            ("-f", DROP, DROP),
            ("-a", DROP, None),
        ],
    },
    Seed {
        unix: "kill",
        powershell: Some("Stop-Process"),
        cmd: None,
        requires_arguments: true,
        flags: &[("-9", Some("-Force"), None), ("-KILL", Some("-Force"), None)],
    },
    Seed {
        unix: "printenv",
        powershell: Some("Get-ChildItem Env:"),
        cmd: Some("set"),
        requires_arguments: false,
        flags: &[],
    },
    Seed {
        unix: "env",
        powershell: Some("Get-ChildItem Env:"),
        cmd: Some("set"),
        requires_arguments: false,
        flags: &[],
    },
    Seed {
        unix: "df",
        powershell: Some("Get-PSDrive"),
        cmd: None,
        requires_arguments: false,
        flags: &[("-h", DROP, None)],
    },
    Seed {
        unix: "date",
        powershell: Some("Get-Date"),
        cmd: None,
        requires_arguments: false,
        flags: &[],
    },
    Seed {
        unix: "sleep",
        powershell: Some("Start-Sleep"),
        cmd: Some("timeout /t"),
        requires_arguments: true,
        flags: &[],
    },
    Seed {
        unix: "hostname",
        powershell: Some("hostname"),
        cmd: Some("hostname"),
        requires_arguments: false,
        flags: &[],
    },
    Seed {
        unix: "whoami",
        powershell: Some("whoami"),
        cmd: Some("whoami"),
        requires_arguments: false,
        flags: &[],
    },
    Seed {
        unix: "curl",
        powershell: Some("Invoke-WebRequest"),
        cmd: Some("curl"),
        requires_arguments: true,
        flags: &[
            ("-o", Some("-OutFile"), Some("-o")),
            ("--output", Some("-OutFile"), Some("--output")),
            ("-s", DROP, Some("-s")),
            ("--silent", DROP, Some("--silent")),
            ("-S", DROP, Some("-S")),
            ("-L", DROP, Some("-L")),
            ("-X", Some("-Method"), Some("-X")),
        ],
    },
    Seed {
        unix: "wget",
        powershell: Some("Invoke-WebRequest"),
        cmd: None,
        requires_arguments: true,
        flags: &[("-O", Some("-OutFile"), None), ("-q", DROP, None)],
    },
    Seed {
        unix: "man",
        powershell: Some("Get-Help"),
        cmd: Some("help"),
        requires_arguments: true,
        flags: &[],
    },
    Seed {
        unix: "history",
        powershell: Some("Get-History"),
        cmd: Some("doskey /history"),
        requires_arguments: false,
        flags: &[],
    },
    Seed {
        unix: "tee",
        powershell: Some("Tee-Object"),
        cmd: None,
        requires_arguments: true,
        flags: &[("-a", Some("-Append"), None), ("--append", Some("-Append"), None)],
    },
    Seed {
        unix: "ping",
        powershell: Some("ping"),
        cmd: Some("ping"),
        requires_arguments: true,
        flags: &[("-c", Some("-n"), Some("-n"))],
    },
    Seed {
        unix: "ifconfig",
        powershell: Some("Get-NetIPConfiguration"),
        cmd: Some("ipconfig"),
        requires_arguments: false,
        flags: &[("-a", DROP, Some("/all"))],
    },
];

fn owned(spelling: Option<&'static str>) -> Option<String> {
    spelling.map(str::to_string)
}

/// The built-in table as canonical mappings
pub(super) fn mappings() -> Vec<BidirectionalMapping> {
    SEEDS
        .iter()
        .map(|seed| BidirectionalMapping {
            unix: Some(seed.unix.to_string()),
            powershell: owned(seed.powershell),
            cmd: owned(seed.cmd),
            requires_arguments: seed.requires_arguments,
            flags: seed
                .flags
                .iter()
                .map(|&(unix, powershell, cmd)| FlagSpec {
                    unix: Some(unix.to_string()),
                    powershell: owned(powershell),
                    cmd: owned(cmd),
                })
                .collect(),
        })
        .collect()
}
