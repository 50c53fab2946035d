pub mod ask_poll;
