//! Test fixtures and constants.

/// A registry with two groups and an orphan line before the first marker.
pub const SAMPLE_REGISTRY: &str = "\
# managed by fleetssh
10.9.9.9:ORPHAN
@@north@@
10.0.1.1:SN-N1
10.0.1.2:SN-N2

@@south@@
10.0.2.1:SN-S1
";

/// Router configuration without a profile directive.
pub const PLAIN_CONFIG: &str = "\
SNMP_NAME=router
LAN_IPADDR=192.168.1.1
";

/// Router configuration with a profile directive.
pub const PROFILED_CONFIG: &str = "\
LAN_IPADDR=192.168.1.1
PROFILE=alt1
SNMP_NAME=router
";

/// Minimal gzip member header followed by junk; enough for the type sniff.
pub const GZIP_BYTES: &[u8] = &[0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03];

/// Device settings file holding SNMP parameters.
pub const SNMP_SETTINGS: &str = "\
SNMP_ENABLED=1
SNMP_NAME=default
";

/// A valid group key password.
pub const PASSWORD: &str = "Fleet-key-2024";
