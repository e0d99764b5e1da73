//! Post storage scoped by owner

use super::ServiceError;
use crate::database::Database;
use crate::models::{Post, PostDraft, Subject};

use chrono::Utc;
use validator::Validate;

const POST_COLUMNS: &str =
    "post_id, user_id, post_title, post_content, post_created, post_updated";

/// Post service
#[derive(Clone)]
pub struct PostStore {
    db: Database,
}

impl PostStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All posts
    pub async fn list(&self) -> Result<Vec<Post>, ServiceError> {
        let sql = format!("SELECT {} FROM posts ORDER BY post_id", POST_COLUMNS);
        Ok(self.db.query(&sql, &[]).await?)
    }

    /// A post by id
    pub async fn get(&self, post_id: i64) -> Result<Post, ServiceError> {
        let sql = format!("SELECT {} FROM posts WHERE post_id = $1", POST_COLUMNS);
        self.db
            .query_single(&sql, &[post_id.into()])
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Post not found: {}", post_id)))
    }

    /// Posts owned by any user id (public listing)
    pub async fn by_owner(&self, user_id: i64) -> Result<Vec<Post>, ServiceError> {
        let sql = format!(
            "SELECT {} FROM posts WHERE user_id = $1 ORDER BY post_id",
            POST_COLUMNS
        );
        Ok(self.db.query(&sql, &[user_id.into()]).await?)
    }

    /// Posts owned by the authenticated subject
    pub async fn mine(&self, subject: Subject) -> Result<Vec<Post>, ServiceError> {
        self.by_owner(subject.user_id()).await
    }

    /// Create a post owned by the subject
    pub async fn create(&self, subject: Subject, draft: PostDraft) -> Result<i64, ServiceError> {
        draft.validate()?;

        let now = Utc::now().timestamp();
        let row: Option<(i64,)> = self
            .db
            .query_single(
                r#"INSERT INTO posts (user_id, post_title, post_content, post_created, post_updated)
                   VALUES ($1, $2, $3, $4, $5)
                   RETURNING post_id"#,
                &[
                    subject.user_id().into(),
                    draft.title.into(),
                    draft.content.into(),
                    now.into(),
                    now.into(),
                ],
            )
            .await?;

        let (post_id,) = row.ok_or_else(|| ServiceError::NotFound("inserted post".to_string()))?;

        tracing::debug!(post_id, user_id = subject.user_id(), "Post created");

        Ok(post_id)
    }

    /// Replace title and content of a post the subject owns.
    ///
    /// A post that is missing or owned by someone else is indistinguishable:
    /// both yield [`ServiceError::PermissionDenied`].
    pub async fn edit(
        &self,
        subject: Subject,
        post_id: i64,
        draft: PostDraft,
    ) -> Result<(), ServiceError> {
        draft.validate()?;

        let updated = self
            .db
            .execute(
                r#"UPDATE posts
                   SET post_title = $1, post_content = $2, post_updated = $3
                   WHERE post_id = $4 AND user_id = $5"#,
                &[
                    draft.title.into(),
                    draft.content.into(),
                    Utc::now().timestamp().into(),
                    post_id.into(),
                    subject.user_id().into(),
                ],
            )
            .await?;

        if updated == 0 {
            tracing::debug!(post_id, user_id = subject.user_id(), "Edit rejected: not owner");
            return Err(ServiceError::PermissionDenied);
        }

        Ok(())
    }

    /// Delete a post the subject owns
    pub async fn delete(&self, subject: Subject, post_id: i64) -> Result<(), ServiceError> {
        let deleted = self
            .db
            .execute(
                "DELETE FROM posts WHERE post_id = $1 AND user_id = $2",
                &[post_id.into(), subject.user_id().into()],
            )
            .await?;

        if deleted == 0 {
            tracing::debug!(post_id, user_id = subject.user_id(), "Delete rejected: not owner");
            return Err(ServiceError::PermissionDenied);
        }

        Ok(())
    }

    /// Posts whose title or content contains `term` literally.
    ///
    /// `%` and `_` in `term` match themselves, not any character.
    pub async fn search(&self, term: &str) -> Result<Vec<Post>, ServiceError> {
        let sql = format!(
            r"SELECT {} FROM posts
               WHERE post_title LIKE $1 ESCAPE '\' OR post_content LIKE $1 ESCAPE '\'
               ORDER BY post_id",
            POST_COLUMNS
        );
        let pattern = format!("%{}%", escape_like(term));
        Ok(self.db.query(&sql, &[pattern.into()]).await?)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use tokio_test::{assert_err, assert_ok};

    fn draft(title: &str, content: &str) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_owner_can_edit_and_delete() {
        let (_dir, db) = testing::database().await;
        let posts = PostStore::new(db);
        let owner = Subject::new(1);

        let id = assert_ok!(posts.create(owner, draft("first", "hello")).await);
        assert_ok!(posts.edit(owner, id, draft("first!", "hello again")).await);

        let post = assert_ok!(posts.get(id).await);
        assert_eq!(post.title, "first!");
        assert_eq!(post.content, "hello again");
        assert_eq!(post.user_id, 1);

        assert_ok!(posts.delete(owner, id).await);
        assert!(matches!(posts.get(id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_other_subject_cannot_edit_or_delete() {
        let (_dir, db) = testing::database().await;
        let posts = PostStore::new(db);
        let owner = Subject::new(1);
        let intruder = Subject::new(2);

        let id = assert_ok!(posts.create(owner, draft("mine", "keep out")).await);

        let err = assert_err!(posts.edit(intruder, id, draft("pwned", "pwned")).await);
        assert!(matches!(err, ServiceError::PermissionDenied));

        let err = assert_err!(posts.delete(intruder, id).await);
        assert!(matches!(err, ServiceError::PermissionDenied));

        let post = assert_ok!(posts.get(id).await);
        assert_eq!(post.title, "mine");
        assert_eq!(post.content, "keep out");
    }

    #[tokio::test]
    async fn test_edit_missing_post_is_denied() {
        let (_dir, db) = testing::database().await;
        let posts = PostStore::new(db);

        let err = assert_err!(posts.edit(Subject::new(1), 404, draft("t", "c")).await);
        assert!(matches!(err, ServiceError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_invalid_draft_is_rejected_before_storage() {
        let (_dir, db) = testing::database().await;
        let posts = PostStore::new(db);

        let err = assert_err!(posts.create(Subject::new(1), draft("", "c")).await);
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(assert_ok!(posts.list().await).is_empty());
    }

    #[tokio::test]
    async fn test_mine_and_by_owner() {
        let (_dir, db) = testing::database().await;
        let posts = PostStore::new(db);

        assert_ok!(posts.create(Subject::new(1), draft("a", "one")).await);
        assert_ok!(posts.create(Subject::new(2), draft("b", "two")).await);
        assert_ok!(posts.create(Subject::new(1), draft("c", "three")).await);

        let mine = assert_ok!(posts.mine(Subject::new(1)).await);
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|p| p.user_id == 1));

        assert_eq!(assert_ok!(posts.by_owner(2).await).len(), 1);
        assert_eq!(assert_ok!(posts.list().await).len(), 3);
    }

    #[tokio::test]
    async fn test_search_binds_term() {
        let (_dir, db) = testing::database().await;
        let posts = PostStore::new(db);

        assert_ok!(posts.create(Subject::new(1), draft("Rust tips", "borrowing")).await);
        assert_ok!(posts.create(Subject::new(1), draft("Gardening", "tomatoes")).await);

        let found = assert_ok!(posts.search("borrow").await);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Rust tips");

        let found = assert_ok!(posts.search("' OR '1'='1").await);
        assert!(found.is_empty());
        assert_eq!(assert_ok!(posts.list().await).len(), 2);
    }

    #[tokio::test]
    async fn test_search_wildcards_match_literally() {
        let (_dir, db) = testing::database().await;
        let posts = PostStore::new(db);

        assert_ok!(posts.create(Subject::new(1), draft("Sale", "100% off")).await);
        assert_ok!(posts.create(Subject::new(1), draft("snake_case", "naming")).await);
        assert_ok!(posts.create(Subject::new(1), draft("Plain", "nothing special")).await);

        let found = assert_ok!(posts.search("%").await);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Sale");

        let found = assert_ok!(posts.search("_").await);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "snake_case");

        assert!(assert_ok!(posts.search("\\").await).is_empty());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a%b_c"), r"a\%b\_c");
        assert_eq!(escape_like(r"back\slash"), r"back\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
