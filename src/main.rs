//! Shop media relay.
//!
//! ```text
//!     Browser                 relay                        Shop Admin API
//!     ───────                 ─────                        ──────────────
//!     POST /api/upload ──▶ rate limiter ──▶ pipeline ──▶ stagedUploadsCreate
//!                                                 ├──▶ staged target (multipart POST)
//!                                                 ├──▶ fileCreate
//!                                                 └──▶ node(id) until READY
//!     POST /api/remove ──▶ shared secret ──▶ remover ──▶ files (paged) → fileDelete
//! ```

use shop_media_relay::lifecycle::startup;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    startup::run().await?;
    Ok(())
}
