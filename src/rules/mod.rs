//! Per-command rewrite rules for Unix commands whose PowerShell form is not a
//! flat flag mapping.
//!
//! Every rule either understands its command's whole argument list or returns
//! `None`, in which case the caller keeps the original text. There is no
//! partial output.

mod text;

use crate::shell::ShellCapability;
use crate::tokenizer::{QuoteKind, Token};
use text::{
    bre_to_dotnet, dequote, is_flag, parse_count, ps_path, ps_string, regex_escape, shell_literal,
};

/// Commands with a dedicated rewrite, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicRule {
    Head,
    Tail,
    Sed,
    Awk,
    Cut,
    Tr,
    Find,
    Xargs,
    Du,
    Chmod,
    Chown,
    Ln,
    Rsync,
    Systemctl,
}

impl DynamicRule {
    pub const ALL: [DynamicRule; 14] = [
        DynamicRule::Head,
        DynamicRule::Tail,
        DynamicRule::Sed,
        DynamicRule::Awk,
        DynamicRule::Cut,
        DynamicRule::Tr,
        DynamicRule::Find,
        DynamicRule::Xargs,
        DynamicRule::Du,
        DynamicRule::Chmod,
        DynamicRule::Chown,
        DynamicRule::Ln,
        DynamicRule::Rsync,
        DynamicRule::Systemctl,
    ];

    #[must_use]
    pub fn command(self) -> &'static str {
        match self {
            DynamicRule::Head => "head",
            DynamicRule::Tail => "tail",
            DynamicRule::Sed => "sed",
            DynamicRule::Awk => "awk",
            DynamicRule::Cut => "cut",
            DynamicRule::Tr => "tr",
            DynamicRule::Find => "find",
            DynamicRule::Xargs => "xargs",
            DynamicRule::Du => "du",
            DynamicRule::Chmod => "chmod",
            DynamicRule::Chown => "chown",
            DynamicRule::Ln => "ln",
            DynamicRule::Rsync => "rsync",
            DynamicRule::Systemctl => "systemctl",
        }
    }

    #[must_use]
    pub fn for_command(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.command() == name)
    }

    /// Rewrite a command given the tokens that follow its name.
    ///
    /// `target` selects version-dependent cmdlet parameters. `inner` translates
    /// a nested command line (used by `xargs`); it returns its input unchanged
    /// when it cannot translate.
    pub fn apply(
        self,
        args: &[Token],
        target: &ShellCapability,
        inner: &dyn Fn(&str) -> String,
    ) -> Option<String> {
        match self {
            DynamicRule::Head => head_tail(args, false, target.version),
            DynamicRule::Tail => head_tail(args, true, target.version),
            DynamicRule::Sed => sed(args),
            DynamicRule::Awk => awk(args),
            DynamicRule::Cut => cut(args),
            DynamicRule::Tr => tr(args),
            DynamicRule::Find => find(args),
            DynamicRule::Xargs => xargs(args, inner),
            DynamicRule::Du => du(args),
            DynamicRule::Chmod => chmod(args),
            DynamicRule::Chown => chown(args),
            DynamicRule::Ln => ln(args),
            DynamicRule::Rsync => rsync(args),
            DynamicRule::Systemctl => systemctl(args),
        }
    }
}

/// `Get-Content FILE | ` prefix for rules that read a file or stdin
fn with_input(file: Option<&Token>, stage: String) -> String {
    match file {
        Some(file) => format!("Get-Content {} | {}", file.value, stage),
        None => stage,
    }
}

/// Push an operand, refusing a second one
fn set_once<'a>(slot: &mut Option<&'a Token>, token: &'a Token) -> Option<()> {
    if slot.is_some() {
        return None;
    }
    *slot = Some(token);
    Some(())
}

// ---------------------------------------------------------------------------
// head / tail
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Unit {
    Lines,
    Bytes,
}

/// Byte-mode switch for `Get-Content`; `-AsByteStream` only exists from
/// PowerShell 6, and an unknown version is treated as Windows PowerShell
fn byte_stream(version: Option<u32>) -> &'static str {
    match version {
        Some(major) if major >= 6 => "-AsByteStream",
        _ => "-Encoding Byte",
    }
}

fn head_tail(args: &[Token], tail: bool, version: Option<u32>) -> Option<String> {
    let mut count: u64 = 10;
    let mut unit = Unit::Lines;
    let mut from_start = false;
    let mut follow = false;
    let mut file = None;

    let mut set_count = |raw: &str, u: Unit| -> Option<()> {
        let digits = match raw.strip_prefix('+') {
            Some(rest) if tail => {
                from_start = true;
                rest
            }
            Some(_) => return None,
            None => raw,
        };
        count = parse_count(digits)?;
        unit = u;
        Some(())
    };

    let mut iter = args.iter();
    while let Some(token) = iter.next() {
        if !is_flag(token) {
            set_once(&mut file, token)?;
            continue;
        }
        let v = token.value.as_str();
        match v {
            "-n" | "--lines" => set_count(iter.next()?.value.as_str(), Unit::Lines)?,
            "-c" | "--bytes" => set_count(iter.next()?.value.as_str(), Unit::Bytes)?,
            "-f" | "--follow" if tail => follow = true,
            _ => {
                if let Some(rest) = v.strip_prefix("--lines=") {
                    set_count(rest, Unit::Lines)?;
                } else if let Some(rest) = v.strip_prefix("--bytes=") {
                    set_count(rest, Unit::Bytes)?;
                } else if let Some(rest) = v.strip_prefix("-n") {
                    set_count(rest, Unit::Lines)?;
                } else if let Some(rest) = v.strip_prefix("-c") {
                    set_count(rest, Unit::Bytes)?;
                } else {
                    set_count(&v[1..], Unit::Lines)?;
                }
            }
        }
    }

    match (tail, unit, file) {
        (false, Unit::Lines, Some(f)) => Some(format!("Get-Content {} -TotalCount {}", f.value, count)),
        (false, Unit::Lines, None) => Some(format!("Select-Object -First {count}")),
        (false, Unit::Bytes, Some(f)) => Some(format!(
            "Get-Content {} {} -TotalCount {}",
            f.value,
            byte_stream(version),
            count
        )),
        (true, Unit::Lines, _) if from_start => {
            if follow {
                return None;
            }
            let skip = count.saturating_sub(1);
            Some(with_input(file, format!("Select-Object -Skip {skip}")))
        }
        (true, Unit::Lines, Some(f)) if follow => {
            Some(format!("Get-Content {} -Tail {} -Wait", f.value, count))
        }
        (true, Unit::Lines, Some(f)) => Some(format!("Get-Content {} -Tail {}", f.value, count)),
        (true, Unit::Lines, None) if !follow => Some(format!("Select-Object -Last {count}")),
        (true, Unit::Bytes, Some(f)) if !follow && !from_start => Some(format!(
            "Get-Content {} {} | Select-Object -Last {}",
            f.value,
            byte_stream(version),
            count
        )),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// sed
// ---------------------------------------------------------------------------

struct Substitution {
    pattern: String,
    replacement: String,
    global: bool,
    ignore_case: bool,
}

fn sed(args: &[Token]) -> Option<String> {
    let mut extended = false;
    let mut quiet = false;
    let mut in_place = false;
    let mut script: Option<String> = None;
    let mut file = None;

    let mut iter = args.iter();
    while let Some(token) = iter.next() {
        if !is_flag(token) {
            if script.is_none() {
                script = Some(shell_literal(token)?);
            } else {
                set_once(&mut file, token)?;
            }
            continue;
        }
        match token.value.as_str() {
            "-e" | "--expression" => {
                if script.is_some() {
                    return None;
                }
                script = Some(shell_literal(iter.next()?)?);
            }
            "-E" | "-r" | "--regexp-extended" => extended = true,
            "-n" | "--quiet" | "--silent" => quiet = true,
            "-i" | "--in-place" => in_place = true,
            cluster => {
                for c in cluster[1..].chars() {
                    match c {
                        'E' | 'r' => extended = true,
                        'n' => quiet = true,
                        'i' => in_place = true,
                        _ => return None,
                    }
                }
            }
        }
    }
    let script = script?;

    if quiet {
        if in_place {
            return None;
        }
        let select = sed_print_range(script.trim())?;
        return Some(with_input(file, select));
    }

    let sub = parse_substitution(script.trim(), extended)?;
    let pattern = ps_string(&sub.pattern);
    let replacement = ps_string(&sub.replacement);
    let expr = if sub.global {
        let op = if sub.ignore_case { "-replace" } else { "-creplace" };
        format!("$_ {op} {pattern}, {replacement}")
    } else {
        let options = if sub.ignore_case { ", 'IgnoreCase'" } else { "" };
        format!("([regex]::new({pattern}{options})).Replace($_, {replacement}, 1)")
    };
    let stage = format!("ForEach-Object {{ {expr} }}");

    match (in_place, file) {
        (true, Some(f)) => Some(format!(
            "(Get-Content {0}) | {1} | Set-Content {0}",
            f.value, stage
        )),
        (true, None) => None,
        (false, file) => Some(with_input(file, stage)),
    }
}

/// `Np` or `M,Np`
fn sed_print_range(script: &str) -> Option<String> {
    let body = script.strip_suffix('p')?;
    match body.split_once(',') {
        None => {
            let line = parse_count(body)?;
            (line >= 1).then(|| format!("Select-Object -Index {}", line - 1))
        }
        Some((from, to)) => {
            let from = parse_count(from)?;
            let to = parse_count(to)?;
            (from >= 1 && to >= from).then(|| {
                format!("Select-Object -Skip {} -First {}", from - 1, to - from + 1)
            })
        }
    }
}

fn parse_substitution(script: &str, extended: bool) -> Option<Substitution> {
    let mut chars = script.chars();
    if chars.next()? != 's' {
        return None;
    }
    let delim = chars.next()?;
    if delim.is_alphanumeric() || delim == '\\' || delim.is_whitespace() {
        return None;
    }

    // Split on unescaped delimiters; an escaped delimiter becomes literal
    let mut parts = vec![String::new()];
    let mut escaped = false;
    for c in chars {
        let current = parts.last_mut()?;
        if escaped {
            if c != delim {
                current.push('\\');
            }
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delim {
            parts.push(String::new());
        } else {
            current.push(c);
        }
    }
    if escaped || parts.len() != 3 {
        return None;
    }

    let flags = parts.pop()?;
    let replacement = parts.pop()?;
    let pattern = parts.pop()?;
    if pattern.is_empty() {
        return None;
    }

    let mut global = false;
    let mut ignore_case = false;
    for flag in flags.chars() {
        match flag {
            'g' => global = true,
            'i' | 'I' => ignore_case = true,
            _ => return None,
        }
    }

    let pattern = if extended {
        pattern
    } else {
        bre_to_dotnet(&pattern)
    };

    Some(Substitution {
        pattern,
        replacement: sed_replacement(&replacement)?,
        global,
        ignore_case,
    })
}

/// Convert a sed replacement (`\1`, `&`) into .NET substitution syntax
fn sed_replacement(replacement: &str) -> Option<String> {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                d @ '0'..='9' => {
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                // A newline cannot be written inside a single-quoted PowerShell string
                'n' | 't' => return None,
                '$' => out.push_str("$$"),
                other => out.push(other),
            },
            '&' => out.push_str("$0"),
            '$' => out.push_str("$$"),
            other => out.push(other),
        }
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// awk
// ---------------------------------------------------------------------------

fn awk(args: &[Token]) -> Option<String> {
    let mut separator: Option<String> = None;
    let mut program: Option<String> = None;
    let mut file = None;

    let mut iter = args.iter();
    while let Some(token) = iter.next() {
        if is_flag(token) {
            let v = token.value.as_str();
            if separator.is_some() || !v.starts_with("-F") {
                return None;
            }
            separator = Some(if v == "-F" {
                shell_literal(iter.next()?)?
            } else {
                dequote(&v[2..])?
            });
        } else if program.is_none() {
            program = Some(shell_literal(token)?);
        } else {
            set_once(&mut file, token)?;
        }
    }

    let fields = parse_print_fields(&program?)?;
    let split = match separator.as_deref() {
        None | Some(" ") => "$_.Trim() -split '\\s+'".to_string(),
        Some("\\t") | Some("\t") => "$_ -split '\\t'".to_string(),
        Some(sep) if sep.chars().count() == 1 => format!("$_ -split {}", ps_string(&regex_escape(sep))),
        // Longer awk separators are regular expressions already
        Some(sep) => format!("$_ -split {}", ps_string(sep)),
    };

    let expr = match fields.as_slice() {
        [0] => "$_".to_string(),
        [n] => format!("({split})[{}]", n - 1),
        many => {
            let picks: Vec<String> = many
                .iter()
                .map(|&n| if n == 0 { "$_".to_string() } else { format!("$f[{}]", n - 1) })
                .collect();
            format!("$f = {split}; ({}) -join ' '", picks.join(", "))
        }
    };

    Some(with_input(file, format!("ForEach-Object {{ {expr} }}")))
}

/// `{print $N[, $M...]}` → field numbers
fn parse_print_fields(program: &str) -> Option<Vec<usize>> {
    let body = program
        .trim()
        .strip_prefix('{')?
        .strip_suffix('}')?
        .trim()
        .trim_end_matches(';')
        .trim();
    let list = body.strip_prefix("print")?;
    if !list.starts_with(char::is_whitespace) {
        return None;
    }
    list.split(',')
        .map(|field| field.trim().strip_prefix('$')?.parse::<usize>().ok())
        .collect()
}

// ---------------------------------------------------------------------------
// cut
// ---------------------------------------------------------------------------

fn cut(args: &[Token]) -> Option<String> {
    let mut delimiter: Option<String> = None;
    let mut fields: Option<Vec<usize>> = None;
    let mut file = None;

    let mut iter = args.iter();
    while let Some(token) = iter.next() {
        if !is_flag(token) {
            set_once(&mut file, token)?;
            continue;
        }
        let v = token.value.as_str();
        let (option, inline) = if let Some(rest) = v.strip_prefix("--delimiter=") {
            ('d', Some(rest))
        } else if let Some(rest) = v.strip_prefix("--fields=") {
            ('f', Some(rest))
        } else if v.len() >= 2 && !v.starts_with("--") {
            let option = v[1..].chars().next()?;
            let rest = &v[1 + option.len_utf8()..];
            (option, (!rest.is_empty()).then_some(rest))
        } else {
            return None;
        };
        let raw = match inline {
            Some(rest) => dequote(rest)?,
            None => shell_literal(iter.next()?)?,
        };
        match option {
            'd' if delimiter.is_none() => delimiter = Some(raw),
            'f' if fields.is_none() => fields = Some(parse_field_list(&raw)?),
            _ => return None,
        }
    }

    let fields = fields?;
    let delimiter = delimiter.unwrap_or_else(|| "\t".to_string());
    if delimiter.chars().count() != 1 {
        return None;
    }
    let (pattern, joiner) = if delimiter == "\t" {
        ("'\\t'".to_string(), "\"`t\"".to_string())
    } else {
        (ps_string(&regex_escape(&delimiter)), ps_string(&delimiter))
    };

    let indices: Vec<String> = fields.iter().map(|f| (f - 1).to_string()).collect();
    let expr = if indices.len() == 1 {
        format!("($_ -split {pattern})[{}]", indices[0])
    } else {
        format!("($_ -split {pattern})[{}] -join {joiner}", indices.join(","))
    };
    Some(with_input(file, format!("ForEach-Object {{ {expr} }}")))
}

/// `1,3` or `2-4`; fields are 1-based
fn parse_field_list(list: &str) -> Option<Vec<usize>> {
    let mut fields = Vec::new();
    for part in list.split(',') {
        match part.split_once('-') {
            None => fields.push(part.parse::<usize>().ok().filter(|&n| n >= 1)?),
            Some((from, to)) => {
                let from: usize = from.parse().ok().filter(|&n| n >= 1)?;
                let to: usize = to.parse().ok()?;
                if to < from || to - from > 64 {
                    return None;
                }
                fields.extend(from..=to);
            }
        }
    }
    (!fields.is_empty()).then_some(fields)
}

// ---------------------------------------------------------------------------
// tr
// ---------------------------------------------------------------------------

fn tr(args: &[Token]) -> Option<String> {
    let (delete, sets) = match args {
        [flag, set] if flag.value == "-d" && flag.quote == QuoteKind::None => (true, vec![set]),
        [from, to] if !is_flag(from) && !is_flag(to) => (false, vec![from, to]),
        _ => return None,
    };
    let sets: Vec<String> = sets.into_iter().map(shell_literal).collect::<Option<_>>()?;

    if delete {
        let class = tr_delete_class(&sets[0])?;
        return Some(format!("ForEach-Object {{ $_ -creplace {}, '' }}", ps_string(&class)));
    }

    let (from, to) = (sets[0].as_str(), sets[1].as_str());
    match (from, to) {
        ("[:lower:]", "[:upper:]") | ("a-z", "A-Z") => {
            return Some("ForEach-Object { $_.ToUpper() }".to_string())
        }
        ("[:upper:]", "[:lower:]") | ("A-Z", "a-z") => {
            return Some("ForEach-Object { $_.ToLower() }".to_string())
        }
        _ => {}
    }

    let from: Vec<char> = plain_set(from)?;
    let to: Vec<char> = plain_set(to)?;
    if from.len() != to.len() || from.is_empty() {
        return None;
    }
    // Chained replacements are only simultaneous when no output feeds a later input
    let mut seen = Vec::with_capacity(from.len());
    for c in &from {
        if seen.contains(c) || to.contains(c) {
            return None;
        }
        seen.push(*c);
    }

    let chain: String = from
        .iter()
        .zip(&to)
        .map(|(a, b)| format!(".Replace({}, {})", ps_string(&a.to_string()), ps_string(&b.to_string())))
        .collect();
    Some(format!("ForEach-Object {{ $_{chain} }}"))
}

/// Characters of a set with no ranges, classes or escapes
fn plain_set(set: &str) -> Option<Vec<char>> {
    if set.is_empty() || set.contains(['\\', '[']) {
        return None;
    }
    let chars: Vec<char> = set.chars().collect();
    // An inner dash is a range
    if chars.len() > 2 && chars[1..chars.len() - 1].contains(&'-') {
        return None;
    }
    Some(chars)
}

fn tr_delete_class(set: &str) -> Option<String> {
    match set {
        "[:digit:]" | "0-9" => Some("\\d".to_string()),
        "[:space:]" => Some("\\s".to_string()),
        "\\n" => Some("\\n".to_string()),
        "\\r" => Some("\\r".to_string()),
        _ => {
            let chars = plain_set(set)?;
            let escaped: String = chars.iter().map(|c| regex_escape(&c.to_string())).collect();
            Some(format!("[{escaped}]"))
        }
    }
}

// ---------------------------------------------------------------------------
// find
// ---------------------------------------------------------------------------

enum FindAction {
    List,
    Delete,
    Echo,
}

fn find(args: &[Token]) -> Option<String> {
    let mut iter = args.iter().peekable();
    let path = match iter.peek() {
        Some(token) if !token.value.starts_with('-') => iter.next(),
        _ => None,
    };

    let mut filter: Option<String> = None;
    let mut kind: Option<&str> = None;
    let mut max_depth: Option<u64> = None;
    let mut action = FindAction::List;

    while let Some(token) = iter.next() {
        if token.quote != QuoteKind::None {
            return None;
        }
        match token.value.as_str() {
            "-name" | "-iname" if filter.is_none() => {
                filter = Some(ps_path(&shell_literal(iter.next()?)?));
            }
            "-type" if kind.is_none() => {
                kind = Some(match iter.next()?.value.as_str() {
                    "f" => "-File",
                    "d" => "-Directory",
                    _ => return None,
                });
            }
            "-maxdepth" if max_depth.is_none() => {
                max_depth = Some(parse_count(&iter.next()?.value)?);
            }
            "-print" => {}
            "-delete" if matches!(action, FindAction::List) => action = FindAction::Delete,
            "-exec" if matches!(action, FindAction::List) => {
                let program = iter.next()?;
                let placeholder = iter.next()?;
                let terminator = iter.next()?;
                let terminated = matches!(terminator.value.as_str(), "\\;" | "';'" | "\";\"");
                if program.value != "echo" || placeholder.value != "{}" || !terminated {
                    return None;
                }
                action = FindAction::Echo;
            }
            _ => return None,
        }
    }

    let mut parts = vec!["Get-ChildItem".to_string()];
    if let Some(path) = path {
        parts.push(path.value.clone());
    }
    match max_depth {
        None => parts.push("-Recurse".to_string()),
        // find's depth 0 is the starting point itself
        Some(0) => return None,
        Some(1) => {}
        Some(n) => parts.push(format!("-Recurse -Depth {}", n - 1)),
    }
    if let Some(filter) = filter {
        parts.push(format!("-Filter {filter}"));
    }
    if let Some(kind) = kind {
        parts.push(kind.to_string());
    }

    let listing = parts.join(" ");
    Some(match action {
        FindAction::List => listing,
        FindAction::Delete => format!("{listing} | Remove-Item"),
        FindAction::Echo => format!("{listing} | ForEach-Object {{ Write-Output $_.FullName }}"),
    })
}

// ---------------------------------------------------------------------------
// xargs
// ---------------------------------------------------------------------------

fn xargs(args: &[Token], inner: &dyn Fn(&str) -> String) -> Option<String> {
    let mut placeholder: Option<String> = None;
    let mut rest = args;

    loop {
        match rest {
            [flag, tail @ ..] if flag.quote == QuoteKind::None && flag.value == "-0" => rest = tail,
            [flag, value, tail @ ..] if flag.quote == QuoteKind::None && flag.value == "-I" => {
                placeholder = Some(shell_literal(value)?);
                rest = tail;
            }
            [flag, tail @ ..] if flag.quote == QuoteKind::None && flag.value.starts_with("-I") => {
                placeholder = Some(flag.value[2..].to_string());
                rest = tail;
            }
            [flag, ..] if is_flag(flag) => return None,
            _ => break,
        }
    }

    if rest.is_empty() {
        return Some("ForEach-Object { Write-Output $_ }".to_string());
    }

    let mut words: Vec<String> = Vec::with_capacity(rest.len() + 1);
    for token in rest {
        match placeholder.as_deref() {
            Some(p) if token.value == p => words.push("$_".to_string()),
            Some(p) if token.value.contains(p) => return None,
            _ => words.push(token.value.clone()),
        }
    }
    if placeholder.is_none() {
        words.push("$_".to_string());
    }

    let command = inner(&words.join(" "));
    Some(format!("ForEach-Object {{ {command} }}"))
}

// ---------------------------------------------------------------------------
// du
// ---------------------------------------------------------------------------

fn du(args: &[Token]) -> Option<String> {
    let mut summarize = false;
    let mut human = false;
    let mut path = None;

    for token in args {
        if !is_flag(token) {
            set_once(&mut path, token)?;
            continue;
        }
        match token.value.as_str() {
            "--summarize" => summarize = true,
            "--human-readable" => human = true,
            "--total" => {}
            v if !v.starts_with("--") => {
                for c in v[1..].chars() {
                    match c {
                        's' => summarize = true,
                        'h' => human = true,
                        'c' => {}
                        _ => return None,
                    }
                }
            }
            _ => return None,
        }
    }
    if !summarize {
        return None;
    }

    let mut out = String::from("Get-ChildItem");
    if let Some(path) = path {
        out.push(' ');
        out.push_str(&path.value);
    }
    out.push_str(" -Recurse -File | Measure-Object -Property Length -Sum");
    if human {
        out.push_str(" | ForEach-Object { '{0:N1} MB' -f ($_.Sum / 1MB) }");
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// chmod / chown / ln
// ---------------------------------------------------------------------------

fn chmod(args: &[Token]) -> Option<String> {
    let (mode, files) = args.split_first()?;
    if files.is_empty() || files.iter().any(is_flag) {
        return None;
    }
    let read_only = read_only_from_mode(&mode.value)?;
    let paths: Vec<&str> = files.iter().map(|t| t.value.as_str()).collect();
    Some(format!(
        "Set-ItemProperty -Path {} -Name IsReadOnly -Value ${}",
        paths.join(", "),
        read_only
    ))
}

/// Whether a mode leaves the owner without write permission.
/// `None` when the mode does not touch the owner's write bit.
fn read_only_from_mode(mode: &str) -> Option<bool> {
    if (3..=4).contains(&mode.len()) && mode.chars().all(|c| ('0'..='7').contains(&c)) {
        let owner = mode.as_bytes()[mode.len() - 3] - b'0';
        return Some(owner & 2 == 0);
    }

    let mut decision = None;
    for clause in mode.split(',') {
        let op_at = clause.find(['+', '-', '='])?;
        let (who, rest) = clause.split_at(op_at);
        if !who.chars().all(|c| "ugoa".contains(c)) {
            return None;
        }
        let op = rest.chars().next()?;
        let perms = &rest[1..];
        if !perms.chars().all(|c| "rwxXst".contains(c)) {
            return None;
        }
        let affects_owner = who.is_empty() || who.contains(['u', 'a']);
        let touches_write = perms.contains('w') || op == '=';
        if !touches_write {
            continue;
        }
        if !affects_owner {
            return None;
        }
        let read_only = match op {
            '+' => false,
            '-' => true,
            _ => !perms.contains('w'),
        };
        if decision.is_some_and(|d| d != read_only) {
            return None;
        }
        decision = Some(read_only);
    }
    decision
}

fn chown(args: &[Token]) -> Option<String> {
    let (recursive, rest) = match args {
        [flag, rest @ ..] if flag.quote == QuoteKind::None && flag.value == "-R" => (true, rest),
        rest => (false, rest),
    };
    let [owner, file] = rest else {
        return None;
    };
    if is_flag(owner) || is_flag(file) || owner.value.contains([':', '.']) {
        return None;
    }
    let suffix = if recursive { " /T" } else { "" };
    Some(format!("icacls {} /setowner {}{}", file.value, owner.value, suffix))
}

fn ln(args: &[Token]) -> Option<String> {
    let mut symbolic = false;
    let mut force = false;
    let mut operands = Vec::new();

    for token in args {
        if !is_flag(token) {
            operands.push(token);
            continue;
        }
        match token.value.as_str() {
            "--symbolic" => symbolic = true,
            "--force" => force = true,
            v if !v.starts_with("--") => {
                for c in v[1..].chars() {
                    match c {
                        's' => symbolic = true,
                        'f' => force = true,
                        _ => return None,
                    }
                }
            }
            _ => return None,
        }
    }

    let [target, link] = operands.as_slice() else {
        return None;
    };
    let kind = if symbolic { "SymbolicLink" } else { "HardLink" };
    let force = if force { " -Force" } else { "" };
    Some(format!(
        "New-Item -ItemType {kind} -Path {} -Target {}{force}",
        link.value, target.value
    ))
}

// ---------------------------------------------------------------------------
// rsync / systemctl
// ---------------------------------------------------------------------------

fn rsync(args: &[Token]) -> Option<String> {
    let mut mirror = false;
    let mut verbose = false;
    let mut operands = Vec::new();

    for token in args {
        if !is_flag(token) {
            operands.push(token);
            continue;
        }
        match token.value.as_str() {
            "--delete" => mirror = true,
            "--progress" | "--archive" | "--recursive" | "--compress" => {}
            "--verbose" => verbose = true,
            v if !v.starts_with("--") => {
                for c in v[1..].chars() {
                    match c {
                        'v' => verbose = true,
                        'a' | 'r' | 'z' | 'h' | 'P' => {}
                        _ => return None,
                    }
                }
            }
            _ => return None,
        }
    }

    let [source, destination] = operands.as_slice() else {
        return None;
    };
    let source_path = shell_literal(source)?;
    let destination_path = shell_literal(destination)?;
    if is_remote(&source_path) || is_remote(&destination_path) {
        return None;
    }

    let contents_only = source_path.ends_with('/');
    if mirror {
        // robocopy always copies a directory's contents
        if !contents_only {
            return None;
        }
        let verbose = if verbose { " /V" } else { "" };
        return Some(format!(
            "robocopy {} {} /MIR{verbose}",
            ps_path(source_path.trim_end_matches('/')),
            destination.value
        ));
    }

    let source_arg = if contents_only {
        ps_path(&format!("{source_path}*"))
    } else {
        source.value.clone()
    };
    let verbose = if verbose { " -Verbose" } else { "" };
    Some(format!(
        "Copy-Item -Path {source_arg} -Destination {} -Recurse -Force{verbose}",
        destination.value
    ))
}

/// `host:path` or `user@host:path`, but not a drive letter like `C:`
fn is_remote(path: &str) -> bool {
    match path.find(':') {
        Some(colon) => {
            let before = &path[..colon];
            !before.contains('/') && !(before.len() == 1 && before.chars().all(|c| c.is_ascii_alphabetic()))
        }
        None => false,
    }
}

fn systemctl(args: &[Token]) -> Option<String> {
    let [action, unit] = args else {
        return None;
    };
    if is_flag(action) || is_flag(unit) {
        return None;
    }
    let name = unit.value.strip_suffix(".service").unwrap_or(&unit.value);
    Some(match action.value.as_str() {
        "start" => format!("Start-Service -Name {name}"),
        "stop" => format!("Stop-Service -Name {name}"),
        "restart" => format!("Restart-Service -Name {name}"),
        "status" => format!("Get-Service -Name {name}"),
        "enable" => format!("Set-Service -Name {name} -StartupType Automatic"),
        "disable" => format!("Set-Service -Name {name} -StartupType Disabled"),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use crate::translator::merge_constructs;

    fn rewrite(command: &str) -> Option<String> {
        let tokens = merge_constructs(&tokenize(command), command);
        let rule = DynamicRule::for_command(&tokens[0].value)?;
        rule.apply(&tokens[1..], &ShellCapability::default(), &|inner| inner.to_string())
    }

    #[test]
    fn test_priority_order_and_lookup() {
        assert_eq!(DynamicRule::ALL[0], DynamicRule::Head);
        assert_eq!(DynamicRule::for_command("sed"), Some(DynamicRule::Sed));
        assert_eq!(DynamicRule::for_command("ls"), None);
        for rule in DynamicRule::ALL {
            assert_eq!(DynamicRule::for_command(rule.command()), Some(rule));
        }
    }

    #[test]
    fn test_head_counts() {
        assert_eq!(rewrite("head -5").unwrap(), "Select-Object -First 5");
        assert_eq!(rewrite("head -n 3").unwrap(), "Select-Object -First 3");
        assert_eq!(rewrite("head -n7").unwrap(), "Select-Object -First 7");
        assert_eq!(rewrite("head").unwrap(), "Select-Object -First 10");
        assert_eq!(rewrite("head --lines=2 a.txt").unwrap(), "Get-Content a.txt -TotalCount 2");
        assert_eq!(
            rewrite("head -c 16 bin.dat").unwrap(),
            "Get-Content bin.dat -AsByteStream -TotalCount 16"
        );
        assert_eq!(
            rewrite("head -c16 bin.dat").unwrap(),
            "Get-Content bin.dat -AsByteStream -TotalCount 16"
        );
    }

    #[test]
    fn test_byte_counts_on_windows_powershell() {
        let tokens = |command: &str| merge_constructs(&tokenize(command), command);
        let head = tokens("head -c 16 bin.dat");
        let tail = tokens("tail -c 4 bin.dat");
        let identity = |inner: &str| inner.to_string();

        for legacy in [ShellCapability::powershell(Some(5)), ShellCapability::powershell(None)] {
            assert_eq!(
                DynamicRule::Head.apply(&head[1..], &legacy, &identity).unwrap(),
                "Get-Content bin.dat -Encoding Byte -TotalCount 16"
            );
            assert_eq!(
                DynamicRule::Tail.apply(&tail[1..], &legacy, &identity).unwrap(),
                "Get-Content bin.dat -Encoding Byte | Select-Object -Last 4"
            );
        }
        assert_eq!(
            DynamicRule::Head
                .apply(&head[1..], &ShellCapability::powershell(Some(7)), &identity)
                .unwrap(),
            "Get-Content bin.dat -AsByteStream -TotalCount 16"
        );
    }

    #[test]
    fn test_head_rejects_unknown_grammar() {
        assert_eq!(rewrite("head -q file"), None);
        assert_eq!(rewrite("head -n"), None);
        assert_eq!(rewrite("head -n abc"), None);
        assert_eq!(rewrite("head a b"), None);
        assert_eq!(rewrite("head -c 5"), None);
        assert_eq!(rewrite("head -n +5"), None);
    }

    #[test]
    fn test_tail_forms() {
        assert_eq!(rewrite("tail -20").unwrap(), "Select-Object -Last 20");
        assert_eq!(rewrite("tail -n 5 log.txt").unwrap(), "Get-Content log.txt -Tail 5");
        assert_eq!(rewrite("tail -f app.log").unwrap(), "Get-Content app.log -Tail 10 -Wait");
        assert_eq!(rewrite("tail -n +2").unwrap(), "Select-Object -Skip 1");
        assert_eq!(
            rewrite("tail -n +3 data.csv").unwrap(),
            "Get-Content data.csv | Select-Object -Skip 2"
        );
        assert_eq!(
            rewrite("tail -c 4 bin.dat").unwrap(),
            "Get-Content bin.dat -AsByteStream | Select-Object -Last 4"
        );
        assert_eq!(rewrite("tail -f"), None);
    }

    #[test]
    fn test_sed_substitution() {
        assert_eq!(
            rewrite("sed 's/foo/bar/g'").unwrap(),
            "ForEach-Object { $_ -creplace 'foo', 'bar' }"
        );
        assert_eq!(
            rewrite("sed 's|a|b|gi' in.txt").unwrap(),
            "Get-Content in.txt | ForEach-Object { $_ -replace 'a', 'b' }"
        );
        assert_eq!(
            rewrite("sed -e 's/x/y/'").unwrap(),
            "ForEach-Object { ([regex]::new('x')).Replace($_, 'y', 1) }"
        );
    }

    #[test]
    fn test_sed_groups_and_backrefs() {
        assert_eq!(
            rewrite(r"sed 's/\(a*\)b/\1-&/g'").unwrap(),
            "ForEach-Object { $_ -creplace '(a*)b', '${1}-$0' }"
        );
        assert_eq!(
            rewrite(r"sed -E 's/(a+)/[\1]/g'").unwrap(),
            "ForEach-Object { $_ -creplace '(a+)', '[${1}]' }"
        );
        // BRE literal parens become escaped .NET parens
        assert_eq!(
            rewrite("sed 's/f(x)/y/g'").unwrap(),
            r"ForEach-Object { $_ -creplace 'f\(x\)', 'y' }"
        );
    }

    #[test]
    fn test_sed_quotes_in_pattern() {
        assert_eq!(
            rewrite(r#"sed "s/it's/it is/g""#).unwrap(),
            "ForEach-Object { $_ -creplace 'it''s', 'it is' }"
        );
    }

    #[test]
    fn test_sed_in_place() {
        assert_eq!(
            rewrite("sed -i 's/a/b/g' conf.ini").unwrap(),
            "(Get-Content conf.ini) | ForEach-Object { $_ -creplace 'a', 'b' } | Set-Content conf.ini"
        );
        assert_eq!(rewrite("sed -i 's/a/b/g'"), None);
    }

    #[test]
    fn test_sed_line_select() {
        assert_eq!(rewrite("sed -n '5p'").unwrap(), "Select-Object -Index 4");
        assert_eq!(
            rewrite("sed -n '2,4p' f.txt").unwrap(),
            "Get-Content f.txt | Select-Object -Skip 1 -First 3"
        );
        assert_eq!(rewrite("sed -n '0p'"), None);
        assert_eq!(rewrite("sed -n '4,2p'"), None);
    }

    #[test]
    fn test_sed_rejects_other_scripts() {
        assert_eq!(rewrite("sed '1d'"), None);
        assert_eq!(rewrite("sed 's/a/b/w out'"), None);
        assert_eq!(rewrite("sed 's/a/b'"), None);
        assert_eq!(rewrite(r"sed 's/a/\n/g'"), None);
        assert_eq!(rewrite("sed \"s/$x/y/g\""), None);
        assert_eq!(rewrite("sed --posix 's/a/b/'"), None);
    }

    #[test]
    fn test_awk_print() {
        assert_eq!(
            rewrite("awk '{print $2}'").unwrap(),
            "ForEach-Object { ($_.Trim() -split '\\s+')[1] }"
        );
        assert_eq!(
            rewrite("awk -F: '{print $1}' /etc/passwd").unwrap(),
            "Get-Content /etc/passwd | ForEach-Object { ($_ -split ':')[0] }"
        );
        assert_eq!(
            rewrite("awk -F ',' '{ print $1, $3 }'").unwrap(),
            "ForEach-Object { $f = $_ -split ','; ($f[0], $f[2]) -join ' ' }"
        );
        assert_eq!(rewrite("awk '{print $0}'").unwrap(), "ForEach-Object { $_ }");
    }

    #[test]
    fn test_awk_rejects_programs() {
        assert_eq!(rewrite("awk '{sum += $1} END {print sum}'"), None);
        assert_eq!(rewrite("awk '/x/ {print $1}'"), None);
        assert_eq!(rewrite("awk '{print NF}'"), None);
        assert_eq!(rewrite("awk -v x=1 '{print $1}'"), None);
    }

    #[test]
    fn test_cut_fields() {
        assert_eq!(
            rewrite("cut -d ',' -f 2").unwrap(),
            "ForEach-Object { ($_ -split ',')[1] }"
        );
        assert_eq!(
            rewrite("cut -d. -f1,3 hosts").unwrap(),
            "Get-Content hosts | ForEach-Object { ($_ -split '\\.')[0,2] -join '.' }"
        );
        assert_eq!(
            rewrite("cut -f 2-3").unwrap(),
            "ForEach-Object { ($_ -split '\\t')[1,2] -join \"`t\" }"
        );
        assert_eq!(
            rewrite("cut -d':' -f1").unwrap(),
            "ForEach-Object { ($_ -split ':')[0] }"
        );
    }

    #[test]
    fn test_cut_rejects() {
        assert_eq!(rewrite("cut -c 1-5"), None);
        assert_eq!(rewrite("cut -d ','"), None);
        assert_eq!(rewrite("cut -d ab -f 1"), None);
        assert_eq!(rewrite("cut -f 0"), None);
    }

    #[test]
    fn test_tr_forms() {
        assert_eq!(rewrite("tr 'a-z' 'A-Z'").unwrap(), "ForEach-Object { $_.ToUpper() }");
        assert_eq!(
            rewrite("tr '[:upper:]' '[:lower:]'").unwrap(),
            "ForEach-Object { $_.ToLower() }"
        );
        assert_eq!(
            rewrite("tr ',' ';'").unwrap(),
            "ForEach-Object { $_.Replace(',', ';') }"
        );
        assert_eq!(
            rewrite("tr 'ab' 'xy'").unwrap(),
            "ForEach-Object { $_.Replace('a', 'x').Replace('b', 'y') }"
        );
        assert_eq!(
            rewrite("tr -d '[:digit:]'").unwrap(),
            "ForEach-Object { $_ -creplace '\\d', '' }"
        );
    }

    #[test]
    fn test_tr_rejects() {
        assert_eq!(rewrite("tr 'ab' 'ba'"), None);
        assert_eq!(rewrite("tr 'abc' 'xy'"), None);
        assert_eq!(rewrite("tr -s ' '"), None);
        assert_eq!(rewrite("tr 'a-f' 'A-F'"), None);
    }

    #[test]
    fn test_find_delete() {
        assert_eq!(
            rewrite("find . -name '*.tmp' -delete").unwrap(),
            "Get-ChildItem . -Recurse -Filter *.tmp | Remove-Item"
        );
    }

    #[test]
    fn test_find_variants() {
        assert_eq!(
            rewrite("find src -type f -name \"*.rs\"").unwrap(),
            "Get-ChildItem src -Recurse -Filter *.rs -File"
        );
        assert_eq!(
            rewrite("find . -maxdepth 1 -type d").unwrap(),
            "Get-ChildItem . -Directory"
        );
        assert_eq!(
            rewrite("find . -maxdepth 3 -name 'a b*'").unwrap(),
            "Get-ChildItem . -Recurse -Depth 2 -Filter 'a b*'"
        );
        assert_eq!(
            rewrite(r"find . -name '*.log' -exec echo {} \;").unwrap(),
            "Get-ChildItem . -Recurse -Filter *.log | ForEach-Object { Write-Output $_.FullName }"
        );
        assert_eq!(rewrite("find").unwrap(), "Get-ChildItem -Recurse");
    }

    #[test]
    fn test_find_rejects() {
        assert_eq!(rewrite(r"find . -exec rm {} \;"), None);
        assert_eq!(rewrite("find . -mtime -1"), None);
        assert_eq!(rewrite("find . -delete -delete"), None);
        assert_eq!(rewrite("find . -type l"), None);
        assert_eq!(rewrite("find . -maxdepth 0"), None);
    }

    #[test]
    fn test_xargs() {
        assert_eq!(
            rewrite("xargs rm -f").unwrap(),
            "ForEach-Object { rm -f $_ }"
        );
        assert_eq!(
            rewrite("xargs -0 wc -l").unwrap(),
            "ForEach-Object { wc -l $_ }"
        );
        assert_eq!(
            rewrite("xargs -I {} cp {} backup/").unwrap(),
            "ForEach-Object { cp $_ backup/ }"
        );
        assert_eq!(rewrite("xargs").unwrap(), "ForEach-Object { Write-Output $_ }");
        assert_eq!(rewrite("xargs -n 1 echo"), None);
        assert_eq!(rewrite("xargs -I {} mv {} {}.bak"), None);
    }

    #[test]
    fn test_xargs_uses_inner_translation() {
        let tokens = merge_constructs(&tokenize("xargs rm"), "xargs rm");
        let out = DynamicRule::Xargs
            .apply(&tokens[1..], &ShellCapability::default(), &|inner| {
                inner.replace("rm", "Remove-Item")
            })
            .unwrap();
        assert_eq!(out, "ForEach-Object { Remove-Item $_ }");
    }

    #[test]
    fn test_du() {
        assert_eq!(
            rewrite("du -s src").unwrap(),
            "Get-ChildItem src -Recurse -File | Measure-Object -Property Length -Sum"
        );
        assert_eq!(
            rewrite("du -sh").unwrap(),
            "Get-ChildItem -Recurse -File | Measure-Object -Property Length -Sum | ForEach-Object { '{0:N1} MB' -f ($_.Sum / 1MB) }"
        );
        assert_eq!(rewrite("du -h"), None);
        assert_eq!(rewrite("du -sk"), None);
    }

    #[test]
    fn test_chmod() {
        assert_eq!(
            rewrite("chmod 444 a.txt").unwrap(),
            "Set-ItemProperty -Path a.txt -Name IsReadOnly -Value $true"
        );
        assert_eq!(
            rewrite("chmod u+w a.txt b.txt").unwrap(),
            "Set-ItemProperty -Path a.txt, b.txt -Name IsReadOnly -Value $false"
        );
        assert_eq!(
            rewrite("chmod -w a.txt").unwrap(),
            "Set-ItemProperty -Path a.txt -Name IsReadOnly -Value $true"
        );
        assert_eq!(
            rewrite("chmod 0755 run.sh").unwrap(),
            "Set-ItemProperty -Path run.sh -Name IsReadOnly -Value $false"
        );
        assert_eq!(rewrite("chmod +x run.sh"), None);
        assert_eq!(rewrite("chmod go-w a.txt"), None);
        assert_eq!(rewrite("chmod -R 755 dir"), None);
        assert_eq!(rewrite("chmod 644"), None);
    }

    #[test]
    fn test_chown() {
        assert_eq!(rewrite("chown alice notes.txt").unwrap(), "icacls notes.txt /setowner alice");
        assert_eq!(rewrite("chown -R alice dir").unwrap(), "icacls dir /setowner alice /T");
        assert_eq!(rewrite("chown alice:staff notes.txt"), None);
        assert_eq!(rewrite("chown alice a b"), None);
    }

    #[test]
    fn test_ln() {
        assert_eq!(
            rewrite("ln -s target.txt link.txt").unwrap(),
            "New-Item -ItemType SymbolicLink -Path link.txt -Target target.txt"
        );
        assert_eq!(
            rewrite("ln -sf a b").unwrap(),
            "New-Item -ItemType SymbolicLink -Path b -Target a -Force"
        );
        assert_eq!(
            rewrite("ln a b").unwrap(),
            "New-Item -ItemType HardLink -Path b -Target a"
        );
        assert_eq!(rewrite("ln -s a"), None);
        assert_eq!(rewrite("ln -t dir a"), None);
    }

    #[test]
    fn test_rsync() {
        assert_eq!(
            rewrite("rsync -av src/ dest").unwrap(),
            "Copy-Item -Path src/* -Destination dest -Recurse -Force -Verbose"
        );
        assert_eq!(
            rewrite("rsync -a src dest").unwrap(),
            "Copy-Item -Path src -Destination dest -Recurse -Force"
        );
        assert_eq!(
            rewrite("rsync -a --delete src/ dest").unwrap(),
            "robocopy src dest /MIR"
        );
        assert_eq!(rewrite("rsync -a src user@host:/srv"), None);
        assert_eq!(rewrite("rsync -a --delete src dest"), None);
        assert_eq!(rewrite("rsync -e ssh a b"), None);
    }

    #[test]
    fn test_rsync_drive_letter_is_local() {
        assert!(!is_remote("C:/backup"));
        assert!(is_remote("host:backup"));
        assert!(!is_remote("./a:b"));
    }

    #[test]
    fn test_systemctl() {
        assert_eq!(rewrite("systemctl start nginx").unwrap(), "Start-Service -Name nginx");
        assert_eq!(
            rewrite("systemctl enable sshd.service").unwrap(),
            "Set-Service -Name sshd -StartupType Automatic"
        );
        assert_eq!(rewrite("systemctl status docker").unwrap(), "Get-Service -Name docker");
        assert_eq!(rewrite("systemctl daemon-reload"), None);
        assert_eq!(rewrite("systemctl --user start x"), None);
        assert_eq!(rewrite("systemctl mask x"), None);
    }
}
