//! 호스트 식별 정보 — 호스트명과 주 IPv4 주소
//!
//! 에이전트 시작 시 한 번 감지하여 모든 이벤트에 동일하게 기록합니다.

use std::net::UdpSocket;

use serde::{Deserialize, Serialize};

/// 호스트 식별 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    /// 호스트명
    pub hostname: String,
    /// 주 IPv4 주소
    pub ipv4: String,
}

impl HostIdentity {
    /// 현재 호스트의 식별 정보를 감지합니다.
    ///
    /// 감지에 실패해도 에러를 내지 않고 안전한 기본값을 사용합니다
    /// (호스트명 "unknown", IP "127.0.0.1").
    pub fn detect() -> Self {
        Self {
            hostname: detect_hostname(),
            ipv4: detect_primary_ipv4(),
        }
    }
}

/// 호스트명을 감지합니다.
///
/// 환경변수(`HOSTNAME`, `COMPUTERNAME`)를 먼저 확인하고,
/// 없으면 `/etc/hostname`을 읽습니다.
fn detect_hostname() -> String {
    for key in ["HOSTNAME", "COMPUTERNAME"] {
        if let Ok(name) = std::env::var(key) {
            let name = name.trim();
            if !name.is_empty() {
                return name.to_owned();
            }
        }
    }

    if let Ok(contents) = std::fs::read_to_string("/etc/hostname") {
        let name = contents.trim();
        if !name.is_empty() {
            return name.to_owned();
        }
    }

    "unknown".to_owned()
}

/// 주 IPv4 주소를 감지합니다.
///
/// 외부 주소로 UDP 소켓을 connect하여 라우팅 테이블이 선택하는 로컬 주소를
/// 알아냅니다. 실제 패킷은 전송되지 않습니다.
fn detect_primary_ipv4() -> String {
    let probe = || -> std::io::Result<String> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip().to_string())
    };

    match probe() {
        Ok(ip) => ip,
        Err(_) => "127.0.0.1".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_returns_non_empty_fields() {
        let identity = HostIdentity::detect();
        assert!(!identity.hostname.is_empty());
        assert!(!identity.ipv4.is_empty());
    }

    #[test]
    fn detected_ipv4_parses_as_ip_address() {
        let identity = HostIdentity::detect();
        assert!(identity.ipv4.parse::<std::net::IpAddr>().is_ok());
    }

    #[test]
    fn identity_serde_roundtrip() {
        let identity = HostIdentity {
            hostname: "web-01".to_owned(),
            ipv4: "192.168.0.100".to_owned(),
        };
        let json = serde_json::to_string(&identity).unwrap();
        let back: HostIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
    }
}
