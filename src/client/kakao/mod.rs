mod client;
mod record;

pub use client::KakaoClient;
pub use record::{
    AddressDetail, AddressDocument, AddressResponse, KeywordDocument, KeywordMeta, KeywordResponse,
};
