//! 응답 본문 압축 코덱
//!
//! `Content-Encoding` 식별자마다 디코딩/인코딩 함수를 하나의 테이블로 묶어 둡니다.
//! 디코딩 지원 범위는 인코딩보다 좁을 수 있습니다 (brotli는 인코딩만 지원).

use std::fmt;
use std::io::{self, Read, Write};
use bytes::Bytes;
use flate2::bufread::{MultiGzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

/// 지원하는 압축 알고리즘
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Identity,
    Gzip,
    Deflate,
    Brotli,
}

type CodecFn = fn(Bytes) -> io::Result<Bytes>;

/// 알고리즘별 변환 함수 쌍
#[derive(Clone, Copy)]
struct Codec {
    decode: Option<CodecFn>,
    encode: CodecFn,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("{0} 디코딩은 지원하지 않음")]
    UnsupportedDecode(Encoding),

    #[error("{encoding} 디코딩 실패: {source}")]
    Decode {
        encoding: Encoding,
        source: io::Error,
    },

    #[error("{encoding} 인코딩 실패: {source}")]
    Encode {
        encoding: Encoding,
        source: io::Error,
    },
}

impl Encoding {
    pub const ALL: [Encoding; 4] = [
        Encoding::Identity,
        Encoding::Gzip,
        Encoding::Deflate,
        Encoding::Brotli,
    ];

    /// `Content-Encoding` 헤더 값을 해석합니다.
    ///
    /// 빈 문자열은 `identity`로 취급합니다. 여러 값이 나열된 경우처럼
    /// 알 수 없는 값은 `None`을 반환합니다.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "identity" => Some(Self::Identity),
            "gzip" | "x-gzip" => Some(Self::Gzip),
            "deflate" => Some(Self::Deflate),
            "br" => Some(Self::Brotli),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Brotli => "br",
        }
    }

    fn codec(self) -> Codec {
        match self {
            Self::Identity => Codec { decode: Some(passthrough), encode: passthrough },
            Self::Gzip => Codec { decode: Some(gunzip), encode: gzip },
            Self::Deflate => Codec { decode: Some(inflate), encode: deflate },
            Self::Brotli => Codec { decode: None, encode: brotli_compress },
        }
    }

    /// 디코딩과 재인코딩이 모두 가능한지 여부
    pub fn can_decode(self) -> bool {
        self.codec().decode.is_some()
    }

    pub fn decode(self, data: Bytes) -> Result<Bytes, CodecError> {
        let decode = self.codec().decode.ok_or(CodecError::UnsupportedDecode(self))?;
        decode(data).map_err(|source| CodecError::Decode { encoding: self, source })
    }

    pub fn encode(self, data: Bytes) -> Result<Bytes, CodecError> {
        (self.codec().encode)(data).map_err(|source| CodecError::Encode { encoding: self, source })
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn passthrough(data: Bytes) -> io::Result<Bytes> {
    Ok(data)
}

fn gunzip(data: Bytes) -> io::Result<Bytes> {
    let mut decoder = MultiGzDecoder::new(&data[..]);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(Bytes::from(out))
}

fn gzip(data: Bytes) -> io::Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&data)?;
    Ok(Bytes::from(encoder.finish()?))
}

fn inflate(data: Bytes) -> io::Result<Bytes> {
    let mut decoder = ZlibDecoder::new(&data[..]);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;

    // 스트림 뒤에 남은 바이트가 있으면 원본을 그대로 복원할 수 없음
    if !decoder.into_inner().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "deflate 스트림 뒤에 데이터가 남아 있음",
        ));
    }
    Ok(Bytes::from(out))
}

fn deflate(data: Bytes) -> io::Result<Bytes> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&data)?;
    Ok(Bytes::from(encoder.finish()?))
}

fn brotli_compress(data: Bytes) -> io::Result<Bytes> {
    let mut compressed = Vec::new();
    brotli::BrotliCompress(
        &mut io::Cursor::new(&data[..]),
        &mut compressed,
        &brotli::enc::BrotliEncoderParams {
            quality: 11,
            lgwin: 22,
            ..Default::default()
        },
    )?;
    Ok(Bytes::from(compressed))
}
