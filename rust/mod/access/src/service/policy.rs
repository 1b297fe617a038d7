use crate::model::{Page, Principal};
use crate::service::menu::pages_for;
use crate::service::AccessError;

/// A page is open to a level iff the level's menu lists it.
pub fn can_access(level: i32, page: Page) -> bool {
    pages_for(level).contains(&page)
}

/// Guard used by every handler before touching its page's data.
pub fn require_page(principal: &Principal, page: Page) -> Result<(), AccessError> {
    if can_access(principal.level(), page) {
        Ok(())
    } else {
        Err(AccessError::Forbidden(format!(
            "El rol {} no tiene acceso a {}.",
            principal.role.display_name, page
        )))
    }
}
