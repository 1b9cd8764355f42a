#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use filedock::transform::ResizeParams;
    use filedock::{
        init, init_with, CandidateFile, ClientOptions, PickSource,
        PickerOptions, Policy, PolicyCall, SessionCache, Transform,
        TransformSource,
    };

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn client_builds_signed_processing_urls() {
        init_logging();
        let security = Policy::new(1_893_456_000)
            .allow(PolicyCall::Convert)
            .sign("app-secret")
            .expect("Failed to sign policy");
        let options = ClientOptions {
            security: Some(security.clone()),
            ..Default::default()
        };
        let client = init_with("A5kYm2PqR", options).unwrap();

        let url = client
            .transform(
                &TransformSource::handle("h9aT3nXwQ"),
                &Transform::new().resize(ResizeParams {
                    width: Some(320),
                    ..Default::default()
                }),
            )
            .unwrap();

        let expected = format!(
            "https://cdn.filedock.io/security=policy:{},signature:{}/resize=width:320/h9aT3nXwQ",
            security.policy, security.signature
        );
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn session_cache_restores_credentials_across_clients() {
        let temp_dir =
            tempfile::tempdir().expect("Failed to create temporary directory");
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        std::env::set_var("HOME", temp_dir.path());

        let security = Policy::new(1_893_456_000)
            .allow(PolicyCall::Read)
            .allow(PolicyCall::Remove)
            .sign("app-secret")
            .unwrap();
        let options = ClientOptions {
            security: Some(security.clone()),
            session_cache: true,
            ..Default::default()
        };
        let first = init_with("A5kYm2PqR", options).unwrap();
        assert_eq!(first.security(), Some(&security));
        drop(first);

        // A fresh client with no credentials of its own picks them up
        // from the cache.
        let restored = init_with(
            "A5kYm2PqR",
            ClientOptions {
                session_cache: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(restored.security(), Some(&security));

        // Another apikey shares nothing.
        let other = init_with(
            "Zq8wNv4Xk",
            ClientOptions {
                session_cache: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(other.security().is_none());

        // Dropping the entry logs the apikey out locally.
        let mut cache = SessionCache::load().unwrap();
        assert!(cache.remove("A5kYm2PqR").unwrap());
        let after = init_with(
            "A5kYm2PqR",
            ClientOptions {
                session_cache: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(after.security().is_none());
    }

    #[tokio::test]
    async fn pick_surfaces_hook_rejections_without_uploading() {
        init_logging();
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("one.jpg"), b"jpeg bytes").unwrap();
        fs::write(temp_dir.path().join("two.jpg"), b"jpeg bytes").unwrap();

        let client = init("A5kYm2PqR").unwrap();
        let response = client
            .pick(PickerOptions {
                sources: vec![PickSource::Dir(temp_dir.path().to_path_buf())],
                on_file_selected: Some(Arc::new(|file: &CandidateFile| {
                    Err(format!("{} is not welcome here", file.filename))
                })),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(response.files_uploaded.is_empty());
        assert_eq!(response.files_failed.len(), 2);
        assert!(response.files_failed[0]
            .error
            .contains("is not welcome here"));
    }

    #[tokio::test]
    async fn pick_enforces_minimum_file_count() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("only.pdf"), b"%PDF-").unwrap();

        let client = init("A5kYm2PqR").unwrap();
        let result = client
            .pick(PickerOptions {
                sources: vec![PickSource::Dir(temp_dir.path().to_path_buf())],
                min_files: Some(3),
                ..Default::default()
            })
            .await;

        assert!(result.is_err());
    }
}
