//! Permission checks gating reads and mutations.

use unifile_core::error::AppError;
use unifile_core::result::AppResult;
use unifile_core::types::{FileMetadata, Permission};

/// Two-level access rules.
///
/// - `public` files may be read by any caller, anonymous included.
/// - `private` files may only be read by their uploader.
/// - Only the uploader may delete a file or request processing on it,
///   whatever its permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessController;

impl AccessController {
    pub fn new() -> Self {
        Self
    }

    pub fn can_read(&self, file: &FileMetadata, user_id: Option<&str>) -> bool {
        match file.permission {
            Permission::Public => true,
            Permission::Private => self.is_owner(file, user_id),
        }
    }

    pub fn can_modify(&self, file: &FileMetadata, user_id: Option<&str>) -> bool {
        self.is_owner(file, user_id)
    }

    /// Fail with `AccessDenied` unless `user_id` may read `file`.
    pub fn require_read(&self, file: &FileMetadata, user_id: Option<&str>) -> AppResult<()> {
        if self.can_read(file, user_id) {
            return Ok(());
        }
        Err(AppError::access_denied(format!(
            "Access denied to file {}",
            file.id
        )))
    }

    /// Fail with `AccessDenied` unless `user_id` owns `file`.
    pub fn require_modify(&self, file: &FileMetadata, user_id: Option<&str>) -> AppResult<()> {
        if self.can_modify(file, user_id) {
            return Ok(());
        }
        Err(AppError::access_denied(format!(
            "Only the uploader may modify file {}",
            file.id
        )))
    }

    fn is_owner(&self, file: &FileMetadata, user_id: Option<&str>) -> bool {
        user_id.is_some_and(|u| !u.is_empty() && u == file.uploader_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use unifile_core::error::ErrorKind;
    use unifile_core::types::{FileId, StorageType};

    fn file(permission: Permission) -> FileMetadata {
        FileMetadata {
            id: FileId::new(),
            original_name: "a.txt".into(),
            storage_name: "x.txt".into(),
            size: 1,
            mime_type: "text/plain".into(),
            extension: ".txt".into(),
            content_hash: String::new(),
            upload_time: Utc::now(),
            permission,
            uploader_id: "alice".into(),
            module_id: "test".into(),
            business_id: None,
            storage_provider: StorageType::Local,
            storage_path: "test/x.txt".into(),
            cdn_url: None,
            access_count: 0,
            download_count: 0,
            last_access_time: None,
            expires_at: None,
            metadata: HashMap::new(),
            artifacts: Vec::new(),
            is_deleted: false,
            deleted_at: None,
        }
    }

    #[test]
    fn test_private_is_owner_only() {
        let access = AccessController::new();
        let f = file(Permission::Private);
        assert!(access.require_read(&f, Some("alice")).is_ok());
        let err = access.require_read(&f, Some("bob")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccessDenied);
        assert!(access.require_read(&f, None).is_err());
    }

    #[test]
    fn test_public_read_but_owner_modify() {
        let access = AccessController::new();
        let f = file(Permission::Public);
        assert!(access.can_read(&f, None));
        assert!(access.can_read(&f, Some("bob")));
        assert!(!access.can_modify(&f, Some("bob")));
        assert!(!access.can_modify(&f, Some("")));
        assert!(access.can_modify(&f, Some("alice")));
    }
}
