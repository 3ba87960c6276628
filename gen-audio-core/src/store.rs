//! The metadata store surface (§6): users, books, and the audio-chunk
//! registry. Folded into one `MetadataStore` trait rather than a seventh
//! network service, per the DESIGN.md note on §9's open question — the
//! registry is just three more methods on the same store that already
//! owns book rows, keeping exactly one source of truth for `total_chunks`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AudioChunk, Book, BookState, User};

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> anyhow::Result<User>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()>;
    async fn touch_last_login(&self, user_id: Uuid) -> anyhow::Result<()>;

    async fn create_book(
        &self,
        id: Uuid,
        owner_id: Uuid,
        title: &str,
        original_filename: &str,
        source_format: &str,
    ) -> anyhow::Result<Book>;
    async fn find_book(&self, id: Uuid) -> anyhow::Result<Option<Book>>;
    async fn list_books_for_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Book>>;
    async fn delete_book(&self, id: Uuid) -> anyhow::Result<()>;

    /// Advance a book's state and, optionally, its monotonic
    /// percent-complete. `None` leaves the stored percent unchanged, which
    /// a `Failed` transition always does (§4.2: failure preserves the
    /// client-visible progress reached so far). `error` is set only when
    /// `state` is `Failed`.
    async fn transition_book(
        &self,
        id: Uuid,
        state: BookState,
        percent_complete: Option<u8>,
        error: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Replace the chunk registry for a book wholesale — the transcoder
    /// posts the complete list on completion (§9), so there is never a
    /// partial-append case to reconcile.
    async fn replace_chunks(&self, book_id: Uuid, chunks: &[AudioChunk]) -> anyhow::Result<()>;
    async fn list_chunks(&self, book_id: Uuid) -> anyhow::Result<Vec<AudioChunk>>;
    async fn delete_chunks(&self, book_id: Uuid) -> anyhow::Result<()>;
}

pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, NULL)
            RETURNING id, username, email, password_hash, created_at, last_login_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, last_login_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, last_login_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn touch_last_login(&self, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_book(
        &self,
        id: Uuid,
        owner_id: Uuid,
        title: &str,
        original_filename: &str,
        source_format: &str,
    ) -> anyhow::Result<Book> {
        let now = Utc::now();
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (id, owner_id, title, original_filename, source_format, state,
                                percent_complete, error_message, total_chunks, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', 0, NULL, NULL, $6, $6)
            RETURNING id, owner_id, title, original_filename, source_format, state,
                      percent_complete, error_message, total_chunks, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(title)
        .bind(original_filename)
        .bind(source_format)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    async fn find_book(&self, id: Uuid) -> anyhow::Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"SELECT id, owner_id, title, original_filename, source_format, state,
                      percent_complete, error_message, total_chunks, created_at, updated_at
               FROM books WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn list_books_for_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"SELECT id, owner_id, title, original_filename, source_format, state,
                      percent_complete, error_message, total_chunks, created_at, updated_at
               FROM books WHERE owner_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn delete_book(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn transition_book(
        &self,
        id: Uuid,
        state: BookState,
        percent_complete: Option<u8>,
        error: Option<&str>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE books SET state = $1, percent_complete = COALESCE($2, percent_complete), error_message = $3, updated_at = $4 WHERE id = $5",
        )
        .bind(state)
        .bind(percent_complete.map(|p| p as i16))
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace_chunks(&self, book_id: Uuid, chunks: &[AudioChunk]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM audio_chunks WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;
        for chunk in chunks {
            sqlx::query(
                r#"INSERT INTO audio_chunks (book_id, seq, duration_ms, byte_size, storage_path, created_at)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(chunk.book_id)
            .bind(chunk.seq)
            .bind(chunk.duration_ms)
            .bind(chunk.byte_size)
            .bind(&chunk.storage_path)
            .bind(chunk.created_at)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("UPDATE books SET total_chunks = $1 WHERE id = $2")
            .bind(chunks.len() as i32)
            .bind(book_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_chunks(&self, book_id: Uuid) -> anyhow::Result<Vec<AudioChunk>> {
        let chunks = sqlx::query_as::<_, AudioChunk>(
            "SELECT book_id, seq, duration_ms, byte_size, storage_path, created_at FROM audio_chunks WHERE book_id = $1 ORDER BY seq ASC",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(chunks)
    }

    async fn delete_chunks(&self, book_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM audio_chunks WHERE book_id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// An in-memory store used by gateway route tests, the same "trait
/// boundary exists so tests don't need a live dependency" pattern as
/// [`crate::broker::mock::MockBroker`].
#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct MockMetadataStore {
        users: Mutex<HashMap<Uuid, User>>,
        books: Mutex<HashMap<Uuid, Book>>,
        chunks: Mutex<HashMap<Uuid, Vec<AudioChunk>>>,
    }

    impl MockMetadataStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl MetadataStore for MockMetadataStore {
        async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> anyhow::Result<User> {
            let mut users = self.users.lock().await;
            if users.values().any(|u| u.email == email) {
                anyhow::bail!("email already registered");
            }
            let user = User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                created_at: Utc::now(),
                last_login_at: None,
            };
            users.insert(user.id, user.clone());
            Ok(user)
        }

        async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
            let users = self.users.lock().await;
            Ok(users.values().find(|u| u.email == email).cloned())
        }

        async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
            let users = self.users.lock().await;
            Ok(users.get(&id).cloned())
        }

        async fn update_password(&self, user_id: Uuid, password_hash: &str) -> anyhow::Result<()> {
            let mut users = self.users.lock().await;
            if let Some(user) = users.get_mut(&user_id) {
                user.password_hash = password_hash.to_string();
            }
            Ok(())
        }

        async fn touch_last_login(&self, user_id: Uuid) -> anyhow::Result<()> {
            let mut users = self.users.lock().await;
            if let Some(user) = users.get_mut(&user_id) {
                user.last_login_at = Some(Utc::now());
            }
            Ok(())
        }

        async fn create_book(
            &self,
            id: Uuid,
            owner_id: Uuid,
            title: &str,
            original_filename: &str,
            source_format: &str,
        ) -> anyhow::Result<Book> {
            let now = Utc::now();
            let book = Book {
                id,
                owner_id,
                title: title.to_string(),
                original_filename: original_filename.to_string(),
                source_format: source_format.to_string(),
                state: BookState::Pending,
                percent_complete: 0,
                error_message: None,
                total_chunks: None,
                created_at: now,
                updated_at: now,
            };
            self.books.lock().await.insert(book.id, book.clone());
            Ok(book)
        }

        async fn find_book(&self, id: Uuid) -> anyhow::Result<Option<Book>> {
            Ok(self.books.lock().await.get(&id).cloned())
        }

        async fn list_books_for_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Book>> {
            let books = self.books.lock().await;
            let mut owned: Vec<Book> = books.values().filter(|b| b.owner_id == owner_id).cloned().collect();
            owned.sort_by_key(|b| std::cmp::Reverse(b.created_at));
            Ok(owned)
        }

        async fn delete_book(&self, id: Uuid) -> anyhow::Result<()> {
            self.books.lock().await.remove(&id);
            Ok(())
        }

        async fn transition_book(
            &self,
            id: Uuid,
            state: BookState,
            percent_complete: Option<u8>,
            error: Option<&str>,
        ) -> anyhow::Result<()> {
            let mut books = self.books.lock().await;
            if let Some(book) = books.get_mut(&id) {
                book.state = state;
                if let Some(percent_complete) = percent_complete {
                    book.percent_complete = percent_complete as i16;
                }
                book.error_message = error.map(str::to_string);
                book.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn replace_chunks(&self, book_id: Uuid, chunks: &[AudioChunk]) -> anyhow::Result<()> {
            self.chunks.lock().await.insert(book_id, chunks.to_vec());
            if let Some(book) = self.books.lock().await.get_mut(&book_id) {
                book.total_chunks = Some(chunks.len() as i32);
            }
            Ok(())
        }

        async fn list_chunks(&self, book_id: Uuid) -> anyhow::Result<Vec<AudioChunk>> {
            Ok(self.chunks.lock().await.get(&book_id).cloned().unwrap_or_default())
        }

        async fn delete_chunks(&self, book_id: Uuid) -> anyhow::Result<()> {
            self.chunks.lock().await.remove(&book_id);
            Ok(())
        }
    }
}
