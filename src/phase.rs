/// Backup lifecycle phase passed by vzdump as the first hook argument.
///
/// The set of known phases is closed; anything else is carried through as
/// `Unknown` so the dispatcher can still report it to the host check
/// instead of crashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    JobInit,
    JobStart,
    BackupStart,
    PreStop,
    PreRestart,
    PostRestart,
    BackupEnd,
    BackupAbort,
    LogEnd,
    JobEnd,
    JobAbort,
    Unknown(String),
}

impl Phase {
    pub fn parse(name: &str) -> Self {
        match name {
            "job-init" => Phase::JobInit,
            "job-start" => Phase::JobStart,
            "backup-start" => Phase::BackupStart,
            "pre-stop" => Phase::PreStop,
            "pre-restart" => Phase::PreRestart,
            "post-restart" => Phase::PostRestart,
            "backup-end" => Phase::BackupEnd,
            "backup-abort" => Phase::BackupAbort,
            "log-end" => Phase::LogEnd,
            "job-end" => Phase::JobEnd,
            "job-abort" => Phase::JobAbort,
            other => Phase::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Phase::JobInit => "job-init",
            Phase::JobStart => "job-start",
            Phase::BackupStart => "backup-start",
            Phase::PreStop => "pre-stop",
            Phase::PreRestart => "pre-restart",
            Phase::PostRestart => "post-restart",
            Phase::BackupEnd => "backup-end",
            Phase::BackupAbort => "backup-abort",
            Phase::LogEnd => "log-end",
            Phase::JobEnd => "job-end",
            Phase::JobAbort => "job-abort",
            Phase::Unknown(name) => name,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_phases() {
        assert_eq!(Phase::parse("job-init"), Phase::JobInit);
        assert_eq!(Phase::parse("backup-start"), Phase::BackupStart);
        assert_eq!(Phase::parse("post-restart"), Phase::PostRestart);
        assert_eq!(Phase::parse("job-abort"), Phase::JobAbort);
    }

    #[test]
    fn test_parse_unknown_phase_is_carried_through() {
        let phase = Phase::parse("job-frobnicate");
        assert_eq!(phase, Phase::Unknown("job-frobnicate".to_string()));
        assert_eq!(phase.as_str(), "job-frobnicate");
    }

    #[test]
    fn test_round_trip() {
        for name in [
            "job-init",
            "job-start",
            "backup-start",
            "pre-stop",
            "pre-restart",
            "post-restart",
            "backup-end",
            "backup-abort",
            "log-end",
            "job-end",
            "job-abort",
        ] {
            assert_eq!(Phase::parse(name).as_str(), name);
        }
    }
}
