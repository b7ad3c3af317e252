use sandbox::SandboxError;

use crate::command::{Privilege, exec};

/// Verify that docker can be driven before handing out a client.
///
/// Checks the CLI binary, sudo access when requested, and that the daemon
/// answers. Collects all failures into a single `BackendNotAvailable` error.
/// Returns the resolved path of the binary.
pub async fn check_prerequisites(
    binary: &str,
    privilege: Privilege,
) -> Result<String, SandboxError> {
    let mut errors = Vec::new();

    let resolved = match which::which(binary) {
        Ok(path) => Some(path.display().to_string()),
        Err(e) => {
            errors.push(format!("required command not found: {binary} ({e})"));
            None
        }
    };

    if matches!(privilege, Privilege::Sudo) {
        check_sudo(&mut errors).await;
    }

    if let Some(resolved) = &resolved
        && errors.is_empty()
    {
        check_daemon(resolved, privilege, &mut errors).await;
    }

    match resolved {
        Some(resolved) if errors.is_empty() => Ok(resolved),
        _ => Err(SandboxError::BackendNotAvailable(errors.join("; "))),
    }
}

async fn check_sudo(errors: &mut Vec<String>) {
    if exec("sudo", &["-n", "true"], Privilege::User)
        .await
        .is_err()
    {
        errors.push(
            "sudo access required to reach the docker daemon; \
             configure passwordless sudo or add the user to the docker group"
                .to_string(),
        );
    }
}

async fn check_daemon(binary: &str, privilege: Privilege, errors: &mut Vec<String>) {
    match exec(
        binary,
        &["version", "--format", "{{.Server.Version}}"],
        privilege,
    )
    .await
    {
        Ok(version) if !version.is_empty() => {}
        Ok(_) => errors.push("docker daemon reported no server version".to_string()),
        Err(e) => errors.push(format!("docker daemon not reachable: {}", e.detail)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_backend_not_available() {
        let err = check_prerequisites("definitely-not-docker-0xdead", Privilege::User)
            .await
            .unwrap_err();
        match err {
            SandboxError::BackendNotAvailable(msg) => {
                assert!(msg.contains("required command not found"), "got: {msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
