// Video generation: prompt building, submission, status polling, QR encoding.
// All provider calls go through video_client; nothing here talks HTTP directly.

pub mod handlers;
pub mod orchestrator;
pub mod poller;
pub mod prompts;
pub mod qr;
