use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        AvatarError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(AvatarError::asset("x").to_string().contains("asset error:"));
    assert!(AvatarError::render("x").to_string().contains("render error:"));
    assert!(
        AvatarError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = AvatarError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn anyhow_context_converts_with_question_mark() {
    fn inner() -> AvatarResult<()> {
        use anyhow::Context as _;
        std::fs::read("/definitely/not/here.png").context("read layer image")?;
        Ok(())
    }
    let err = inner().unwrap_err();
    assert!(matches!(err, AvatarError::Other(_)));
    assert!(err.to_string().contains("read layer image"));
}
