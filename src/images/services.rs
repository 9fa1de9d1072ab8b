use anyhow::Context;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Decoded `data:image/<ext>;base64,<payload>` upload.
#[derive(Debug)]
pub struct DecodedImage {
    pub body: Bytes,
    pub content_type: String,
}

pub fn decode_data_uri(uri: &str) -> Result<DecodedImage, AppError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| AppError::validation("image must be a data URI"))?;
    let (content_type, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| AppError::validation("image must be base64 encoded"))?;
    if !content_type.starts_with("image/") || ext_from_mime(content_type).is_none() {
        return Err(AppError::validation(format!(
            "unsupported image type {content_type}"
        )));
    }
    let body = Base64::decode_vec(payload.trim())
        .map_err(|_| AppError::validation("image is not valid base64"))?;
    if body.is_empty() {
        return Err(AppError::validation("image is empty"));
    }
    Ok(DecodedImage {
        body: Bytes::from(body),
        content_type: content_type.to_string(),
    })
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Write the image under `recipes/<author>/<uuid>.<ext>` and return the key.
pub async fn upload_recipe_image(
    st: &AppState,
    author_id: Uuid,
    image: DecodedImage,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("recipes/{}/{}.{}", author_id, Uuid::new_v4(), ext);
    st.images
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best-effort removal; a leftover object is only logged.
pub async fn discard_image(st: &AppState, key: &str) {
    if let Err(e) = st.images.delete_object(key).await {
        warn!(error = %e, key, "failed to delete image object");
    }
}

pub async fn image_url(st: &AppState, key: &str) -> anyhow::Result<String> {
    st.images
        .presign_get(key, st.config.storage.url_ttl_secs)
        .await
        .with_context(|| format!("presign url for {}", key))
}

#[cfg(test)]
mod image_tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn decodes_png_data_uri() {
        // "hello" in base64
        let img = decode_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(img.content_type, "image/png");
        assert_eq!(&img.body[..], b"hello");
    }

    #[test]
    fn rejects_malformed_uris() {
        for bad in [
            "aGVsbG8=",
            "data:image/png,aGVsbG8=",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png;base64,@@@",
            "data:image/png;base64,",
        ] {
            assert!(
                matches!(decode_data_uri(bad), Err(AppError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn upload_and_presign_use_recipe_prefix() {
        let state = AppState::fake();
        let author = Uuid::new_v4();
        let img = decode_data_uri("data:image/jpeg;base64,aGVsbG8=").unwrap();
        let key = upload_recipe_image(&state, author, img).await.unwrap();
        assert!(key.starts_with(&format!("recipes/{author}/")));
        assert!(key.ends_with(".jpg"));

        let url = image_url(&state, &key).await.unwrap();
        assert!(url.contains(&key));
    }
}
