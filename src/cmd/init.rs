//! `ddns-relay init`: generate a starter configuration file.
//!
//! Writes a minimal YAML config, or with `--full` one that documents
//! every setting and carries commented presets for IONOS, Namecheap
//! and INWX.

use crate::cli::InitArgs;
use crate::error::RelayError;

pub fn execute(args: &InitArgs) -> Result<(), RelayError> {
    let output = &args.output;

    if output.exists() {
        return Err(RelayError::FileExists {
            path: output.clone(),
        });
    }

    let content = if args.full { YAML_FULL } else { YAML_MINIMAL };

    std::fs::write(output, content)?;
    println!("Created {}", output.display());
    Ok(())
}

pub const YAML_MINIMAL: &str = r#"# ddns-relay config
#
# Point the router's DynDNS update URL at
#   http://<relay>:8000/dyndns?hostname=<domain>&ipv4=<ipaddr>
#     &ipv6=<ip6addr>&ipv6prefix=<ip6lanprefix>
# and list every provider that should receive the update below.

providers:
  - name: "example"
    url: "https://dyndns.example.com/update"
    query:
      hostname: "{hostname}"
      ip: "{ipv4}"
      ipv6: "{ipv6}"
"#;

pub const YAML_FULL: &str = r#"# ddns-relay config
#
# All values shown are defaults. Uncomment and modify as needed.
#
# Placeholders usable in url, query and header values:
#   {hostname} {ipv4} {ipv6} {ipv6prefix} {username} {password}
# A placeholder in the url must be present in the update, otherwise the
# provider is skipped. Query entries and headers whose placeholders are
# missing are left out of the call.
#
# ${NAME} anywhere in a provider's url, query, headers or auth is replaced
# by the environment variable NAME when the relay starts.

# inbound:
#   path: "/dyndns"
#   methods: ["GET"]
#   ignore_incomplete_dual_stack: false   # ipv4 + ipv6prefix without ipv6 -> "ignored"
#   params:                               # query parameter names the router sends
#     hostname: "hostname"
#     ipv4: "ipv4"
#     ipv6: "ipv6"
#     ipv6prefix: "ipv6prefix"
#     username: "username"
#     password: "password"

# defaults:
#   timeout: 10000             # Provider timeout in ms
#   max_response_body: 1024    # Bytes of each provider answer kept in results

providers:
  - name: "example"
    url: "https://dyndns.example.com/update"
    query:
      hostname: "{hostname}"
      ip: "{ipv4}"
      ipv6: "{ipv6}"
    # method: "GET"
    # timeout: 5000             # Override defaults.timeout for this provider
    # requires: ["ipv4"]        # Skip the provider when these are missing
    # headers:
    #   X-Api-Key: "${EXAMPLE_KEY}"

  # IONOS: https://developer.hosting.ionos.de/docs/dns (Dynamic DNS)
  # - name: "ionos"
  #   url: "https://api.hosting.ionos.com/dns/v1/dyndns"
  #   query:
  #     q: "${IONOS_Q}"
  #     ipv4: "{ipv4}"
  #     ipv6: "{ipv6}"
  #   ipv6_suffix: "::1234:5678:9abc:def0"   # ipv6 = ipv6prefix | suffix

  # Namecheap (IPv4 only)
  # - name: "namecheap"
  #   url: "https://dynamicdns.park-your-domain.com/update"
  #   requires: ["ipv4"]
  #   query:
  #     host: "home"
  #     domain: "example.org"
  #     password: "${NAMECHEAP_PASSWORD}"
  #     ip: "{ipv4}"

  # INWX: https://www.inwx.de/offer/dyndns
  # - name: "inwx"
  #   url: "https://dyndns.inwx.com/nic/update"
  #   auth:
  #     username: "${INWX_USER}"
  #     password: "${INWX_PASSWORD}"
  #   query:
  #     myip: "{ipv4}"
  #     myipv6: "{ipv6}"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "yaml")]
    #[test]
    fn starter_configs_are_valid() {
        use crate::config::sources::parse_config_str;
        use crate::config::validation::validate;

        for content in [YAML_MINIMAL, YAML_FULL] {
            let config = parse_config_str("yaml", content, "starter").unwrap();
            assert!(validate(&config).is_ok());
            assert_eq!(config.provider_names(), vec!["example"]);
        }
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn presets_are_valid_when_uncommented() {
        use crate::config::sources::parse_config_str;
        use crate::config::validation::validate;

        let start = YAML_FULL.find("  # IONOS").unwrap();
        let presets: String = YAML_FULL[start..]
            .lines()
            .filter_map(|l| l.strip_prefix("  # "))
            .filter(|l| l.starts_with("- ") || l.starts_with("  "))
            .map(|l| format!("  {l}\n"))
            .collect();
        let config =
            parse_config_str("yaml", &format!("providers:\n{presets}"), "presets").unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(config.provider_names(), vec!["ionos", "namecheap", "inwx"]);
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = std::env::temp_dir().join(format!("ddns-relay-init-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let output = dir.join("ddns-relay.yaml");
        std::fs::write(&output, "keep me").unwrap();

        let args = InitArgs {
            output: output.clone(),
            full: false,
        };
        assert!(matches!(execute(&args), Err(RelayError::FileExists { .. })));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "keep me");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
