mod concurrency;
mod lifecycle;
mod setup;
