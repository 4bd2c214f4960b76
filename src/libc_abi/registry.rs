use num_enum::TryFromPrimitive;

/// One entry in the libc call-ID registry: a stable 16-bit identifier
/// naming one host C-runtime function (`spec.md` §6).
///
/// IDs are grouped by category and never renumbered; new functions occupy
/// unused slots within their category's range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
#[repr(u16)]
pub enum CallId {
    // memory: 0x0001-0x000F
    Malloc = 0x0001,
    Free = 0x0002,
    Calloc = 0x0003,
    Realloc = 0x0004,

    // strings: 0x0010-0x001F
    Strlen = 0x0010,
    Strcpy = 0x0011,
    Strncpy = 0x0012,
    Strcmp = 0x0013,
    Strcat = 0x0014,
    Strchr = 0x0015,
    Strstr = 0x0016,

    // memory ops: 0x0020-0x002F
    Memcpy = 0x0020,
    Memmove = 0x0021,
    Memset = 0x0022,
    Memcmp = 0x0023,

    // formatted I/O: 0x0030-0x003F
    Printf = 0x0030,
    Fprintf = 0x0031,
    Sprintf = 0x0032,
    Snprintf = 0x0033,
    Scanf = 0x0034,
    Fscanf = 0x0035,
    Sscanf = 0x0036,

    // file I/O: 0x0040-0x004F
    Fopen = 0x0040,
    Fclose = 0x0041,
    Fread = 0x0042,
    Fwrite = 0x0043,
    Fseek = 0x0044,
    Ftell = 0x0045,
    Feof = 0x0046,
    Ferror = 0x0047,

    // math: 0x0050-0x005F
    Abs = 0x0050,
    Sqrt = 0x0051,
    Pow = 0x0052,
    Sin = 0x0053,
    Cos = 0x0054,
    Tan = 0x0055,

    // conversion: 0x0060-0x006F
    Atoi = 0x0060,
    Atol = 0x0061,
    Atof = 0x0062,
    Strtol = 0x0063,
    Strtod = 0x0064,

    // process: 0x0070-0x007F
    Exit = 0x0070,
    Abort = 0x0071,
    System = 0x0072,
    Getenv = 0x0073,

    // unbuffered I/O: 0x0080-0x008F
    Puts = 0x0080,
    Putchar = 0x0081,
    Getchar = 0x0082,
    Fgetc = 0x0083,
    Fputc = 0x0084,
    Fgets = 0x0085,
    Fputs = 0x0086,

    // extra strings: 0x0090-0x009F
    Strdup = 0x0090,
    Strtok = 0x0091,
    Strrchr = 0x0092,

    // ctype: 0x00A0-0x00AF
    Isalpha = 0x00A0,
    Isdigit = 0x00A1,
    Isspace = 0x00A2,
    Toupper = 0x00A3,
    Tolower = 0x00A4,

    // time: 0x00B0-0x00BF
    Time = 0x00B0,
    Clock = 0x00B1,
    Difftime = 0x00B2,

    // sort/search/rng: 0x00C0-0x00CF
    Qsort = 0x00C0,
    Bsearch = 0x00C1,
    Rand = 0x00C2,
    Srand = 0x00C3,
}

impl CallId {
    /// Canonical name, used only for diagnostics (`spec.md` §4.6).
    #[must_use]
    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Malloc => "malloc",
            Self::Free => "free",
            Self::Calloc => "calloc",
            Self::Realloc => "realloc",
            Self::Strlen => "strlen",
            Self::Strcpy => "strcpy",
            Self::Strncpy => "strncpy",
            Self::Strcmp => "strcmp",
            Self::Strcat => "strcat",
            Self::Strchr => "strchr",
            Self::Strstr => "strstr",
            Self::Memcpy => "memcpy",
            Self::Memmove => "memmove",
            Self::Memset => "memset",
            Self::Memcmp => "memcmp",
            Self::Printf => "printf",
            Self::Fprintf => "fprintf",
            Self::Sprintf => "sprintf",
            Self::Snprintf => "snprintf",
            Self::Scanf => "scanf",
            Self::Fscanf => "fscanf",
            Self::Sscanf => "sscanf",
            Self::Fopen => "fopen",
            Self::Fclose => "fclose",
            Self::Fread => "fread",
            Self::Fwrite => "fwrite",
            Self::Fseek => "fseek",
            Self::Ftell => "ftell",
            Self::Feof => "feof",
            Self::Ferror => "ferror",
            Self::Abs => "abs",
            Self::Sqrt => "sqrt",
            Self::Pow => "pow",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Atoi => "atoi",
            Self::Atol => "atol",
            Self::Atof => "atof",
            Self::Strtol => "strtol",
            Self::Strtod => "strtod",
            Self::Exit => "exit",
            Self::Abort => "abort",
            Self::System => "system",
            Self::Getenv => "getenv",
            Self::Puts => "puts",
            Self::Putchar => "putchar",
            Self::Getchar => "getchar",
            Self::Fgetc => "fgetc",
            Self::Fputc => "fputc",
            Self::Fgets => "fgets",
            Self::Fputs => "fputs",
            Self::Strdup => "strdup",
            Self::Strtok => "strtok",
            Self::Strrchr => "strrchr",
            Self::Isalpha => "isalpha",
            Self::Isdigit => "isdigit",
            Self::Isspace => "isspace",
            Self::Toupper => "toupper",
            Self::Tolower => "tolower",
            Self::Time => "time",
            Self::Clock => "clock",
            Self::Difftime => "difftime",
            Self::Qsort => "qsort",
            Self::Bsearch => "bsearch",
            Self::Rand => "rand",
            Self::Srand => "srand",
        }
    }

    /// Expected argument count, used by the forwarder to size the
    /// argument-descriptor buffer (`spec.md` §4.6).
    #[must_use]
    pub fn arg_count(self) -> usize {
        match self {
            Self::Free
            | Self::Strlen
            | Self::Abs
            | Self::Sqrt
            | Self::Sin
            | Self::Cos
            | Self::Tan
            | Self::Atoi
            | Self::Atol
            | Self::Atof
            | Self::Exit
            | Self::System
            | Self::Getenv
            | Self::Putchar
            | Self::Puts
            | Self::Fclose
            | Self::Ftell
            | Self::Feof
            | Self::Ferror
            | Self::Strdup
            | Self::Isalpha
            | Self::Isdigit
            | Self::Isspace
            | Self::Toupper
            | Self::Tolower
            | Self::Clock
            | Self::Rand
            | Self::Srand
            | Self::Malloc
            | Self::Fgetc
            | Self::Fgets
            | Self::Time => 1,
            Self::Abort | Self::Getchar => 0,
            Self::Calloc
            | Self::Strcpy
            | Self::Strncpy
            | Self::Strcmp
            | Self::Strcat
            | Self::Strchr
            | Self::Strstr
            | Self::Pow
            | Self::Strtol
            | Self::Strtod
            | Self::Fputc
            | Self::Fputs
            | Self::Fopen
            | Self::Fread
            | Self::Fwrite
            | Self::Fseek
            | Self::Difftime
            | Self::Strtok
            | Self::Strrchr
            | Self::Bsearch
            | Self::Realloc => 2,
            Self::Memcpy | Self::Memmove | Self::Memset | Self::Memcmp | Self::Qsort => 3,
            Self::Printf | Self::Sprintf | Self::Scanf | Self::Sscanf => 1,
            Self::Fprintf | Self::Snprintf | Self::Fscanf => 2,
        }
    }
}

/// Name → call-ID lookup used by the parser's cheap libc-call tagging at
/// call-expression construction time (`spec.md` §4.2 "Libc-call tagging").
#[must_use]
pub fn lookup_libc_name(name: &str) -> Option<CallId> {
    let id = match name {
        "malloc" => CallId::Malloc,
        "free" => CallId::Free,
        "calloc" => CallId::Calloc,
        "realloc" => CallId::Realloc,
        "strlen" => CallId::Strlen,
        "strcpy" => CallId::Strcpy,
        "strncpy" => CallId::Strncpy,
        "strcmp" => CallId::Strcmp,
        "strcat" => CallId::Strcat,
        "strchr" => CallId::Strchr,
        "strstr" => CallId::Strstr,
        "memcpy" => CallId::Memcpy,
        "memmove" => CallId::Memmove,
        "memset" => CallId::Memset,
        "memcmp" => CallId::Memcmp,
        "printf" => CallId::Printf,
        "fprintf" => CallId::Fprintf,
        "sprintf" => CallId::Sprintf,
        "snprintf" => CallId::Snprintf,
        "scanf" => CallId::Scanf,
        "fscanf" => CallId::Fscanf,
        "sscanf" => CallId::Sscanf,
        "fopen" => CallId::Fopen,
        "fclose" => CallId::Fclose,
        "fread" => CallId::Fread,
        "fwrite" => CallId::Fwrite,
        "fseek" => CallId::Fseek,
        "ftell" => CallId::Ftell,
        "feof" => CallId::Feof,
        "ferror" => CallId::Ferror,
        "abs" => CallId::Abs,
        "sqrt" => CallId::Sqrt,
        "pow" => CallId::Pow,
        "sin" => CallId::Sin,
        "cos" => CallId::Cos,
        "tan" => CallId::Tan,
        "atoi" => CallId::Atoi,
        "atol" => CallId::Atol,
        "atof" => CallId::Atof,
        "strtol" => CallId::Strtol,
        "strtod" => CallId::Strtod,
        "exit" => CallId::Exit,
        "abort" => CallId::Abort,
        "system" => CallId::System,
        "getenv" => CallId::Getenv,
        "puts" => CallId::Puts,
        "putchar" => CallId::Putchar,
        "getchar" => CallId::Getchar,
        "fgetc" => CallId::Fgetc,
        "fputc" => CallId::Fputc,
        "fgets" => CallId::Fgets,
        "fputs" => CallId::Fputs,
        "strdup" => CallId::Strdup,
        "strtok" => CallId::Strtok,
        "strrchr" => CallId::Strrchr,
        "isalpha" => CallId::Isalpha,
        "isdigit" => CallId::Isdigit,
        "isspace" => CallId::Isspace,
        "toupper" => CallId::Toupper,
        "tolower" => CallId::Tolower,
        "time" => CallId::Time,
        "clock" => CallId::Clock,
        "difftime" => CallId::Difftime,
        "qsort" => CallId::Qsort,
        "bsearch" => CallId::Bsearch,
        "rand" => CallId::Rand,
        "srand" => CallId::Srand,
        _ => return None,
    };
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_matches_registered_functions() {
        assert_eq!(lookup_libc_name("printf"), Some(CallId::Printf));
        assert_eq!(lookup_libc_name("not_a_libc_fn"), None);
    }

    #[test]
    fn try_from_round_trips_through_numeric_id() {
        let id = CallId::Printf as u16;
        assert_eq!(CallId::try_from_primitive(id), Ok(CallId::Printf));
    }

    #[test]
    fn canonical_names_are_lowercase_c_identifiers() {
        assert_eq!(CallId::Malloc.canonical_name(), "malloc");
        assert_eq!(CallId::Qsort.canonical_name(), "qsort");
    }
}
