//! Block alignment for mid-stream decryption.
//!
//! An upstream range fetch can begin at any byte offset, but CTR keystream
//! is generated in 16-byte blocks. The keystream for a byte position
//! depends only on that position's block index and intra-block offset,
//! never on neighboring ciphertext, so the unseen leading bytes of a
//! partially received block can be stood in for by zero placeholders and
//! their decrypted garbage discarded.

use bytes::Bytes;

use super::context::{CipherError, EncryptionContext};
use super::counter::BLOCK_SIZE;

/// Result of decrypting one ciphertext chunk at a logical offset.
///
/// `head` is emitted immediately; `tail`, present when the chunk ran past
/// the first block boundary of a misaligned offset, is queued for the next
/// pull. `next_offset` is the logical offset of the first byte not yet
/// decrypted.
pub struct AlignedChunks {
    pub head: Bytes,
    pub tail: Option<Bytes>,
    pub next_offset: u128,
}

/// Decrypt `ciphertext`, whose first byte sits at logical `offset`.
///
/// Aligned offsets decrypt in one pass. A misaligned offset (remainder
/// `p`) reconstructs the containing block with `p` zero placeholders,
/// decrypts it with the counter of the block-aligned offset, and drops
/// the first `p` output bytes. If the chunk does not complete the block,
/// only the bytes actually present are emitted and the offset advances by
/// exactly that count, so a following chunk resumes mid-block correctly.
pub fn decrypt_chunk(
    ctx: &EncryptionContext,
    offset: u128,
    ciphertext: &[u8],
) -> Result<AlignedChunks, CipherError> {
    let partial = (offset % BLOCK_SIZE as u128) as usize;

    if partial == 0 {
        let mut buf = ciphertext.to_vec();
        ctx.apply_keystream_at(offset, &mut buf)?;
        return Ok(AlignedChunks {
            head: Bytes::from(buf),
            tail: None,
            next_offset: offset + ciphertext.len() as u128,
        });
    }

    // Round down to the containing block boundary.
    let block_start = offset - partial as u128;
    let head_len = (BLOCK_SIZE - partial).min(ciphertext.len());

    let mut block = [0u8; BLOCK_SIZE];
    block[partial..partial + head_len].copy_from_slice(&ciphertext[..head_len]);
    ctx.apply_keystream_at(block_start, &mut block)?;
    let head = Bytes::copy_from_slice(&block[partial..partial + head_len]);

    let mut next_offset = offset + head_len as u128;

    // Bytes past the block boundary are block-aligned again.
    let tail = if ciphertext.len() > head_len {
        let mut buf = ciphertext[head_len..].to_vec();
        ctx.apply_keystream_at(block_start + BLOCK_SIZE as u128, &mut buf)?;
        next_offset += buf.len() as u128;
        Some(Bytes::from(buf))
    } else {
        None
    };

    Ok(AlignedChunks {
        head,
        tail,
        next_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::context::KEY_SIZE;

    fn test_context() -> EncryptionContext {
        let mut counter = [0u8; BLOCK_SIZE];
        counter[7] = 0xA5;
        EncryptionContext::new([0x11u8; KEY_SIZE], counter)
    }

    /// 64 bytes of recognizable plaintext.
    fn plaintext() -> Vec<u8> {
        (0u8..64).collect()
    }

    /// Encrypt the whole plaintext in one shot (CTR encrypt == decrypt).
    fn ciphertext(ctx: &EncryptionContext) -> Vec<u8> {
        let mut buf = plaintext();
        ctx.apply_keystream_at(0, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_aligned_chunk_decrypts_whole() {
        let ctx = test_context();
        let ct = ciphertext(&ctx);

        let out = decrypt_chunk(&ctx, 0, &ct).unwrap();
        assert_eq!(&out.head[..], &plaintext()[..]);
        assert!(out.tail.is_none());
        assert_eq!(out.next_offset, 64);
    }

    #[test]
    fn test_aligned_mid_stream_offset() {
        let ctx = test_context();
        let ct = ciphertext(&ctx);

        // Upstream starts at byte 32, a block boundary.
        let out = decrypt_chunk(&ctx, 32, &ct[32..]).unwrap();
        assert_eq!(out.head[0], plaintext()[32]);
        assert_eq!(&out.head[..], &plaintext()[32..]);
        assert!(out.tail.is_none());
    }

    #[test]
    fn test_misaligned_offset_first_byte() {
        let ctx = test_context();
        let ct = ciphertext(&ctx);

        for offset in [1usize, 5, 15, 17, 37] {
            let out = decrypt_chunk(&ctx, offset as u128, &ct[offset..]).unwrap();
            assert_eq!(out.head[0], plaintext()[offset], "offset {}", offset);

            // Head plus tail reproduce the remaining plaintext exactly.
            let mut emitted = out.head.to_vec();
            if let Some(tail) = out.tail {
                emitted.extend_from_slice(&tail);
            }
            assert_eq!(&emitted[..], &plaintext()[offset..], "offset {}", offset);
            assert_eq!(out.next_offset, 64);
        }
    }

    #[test]
    fn test_misaligned_matches_single_shot_block() {
        let ctx = test_context();
        let ct = ciphertext(&ctx);

        // Single-shot decryption of the whole block containing byte 21.
        let mut block = ct[16..32].to_vec();
        ctx.apply_keystream_at(16, &mut block).unwrap();

        let out = decrypt_chunk(&ctx, 21, &ct[21..32]).unwrap();
        assert_eq!(&out.head[..], &block[5..]);
    }

    #[test]
    fn test_split_read_equivalence() {
        let ctx = test_context();
        let ct = ciphertext(&ctx);

        // One 16-byte block delivered as 5 bytes then 11 bytes.
        let first = decrypt_chunk(&ctx, 0, &ct[..5]).unwrap();
        assert_eq!(first.next_offset, 5);
        let second = decrypt_chunk(&ctx, first.next_offset, &ct[5..16]).unwrap();

        let mut emitted = first.head.to_vec();
        emitted.extend_from_slice(&second.head);
        assert!(first.tail.is_none());
        assert!(second.tail.is_none());

        let single = decrypt_chunk(&ctx, 0, &ct[..16]).unwrap();
        assert_eq!(emitted, single.head.to_vec());
        assert_eq!(&emitted[..], &plaintext()[..16]);
    }

    #[test]
    fn test_short_misaligned_chunk_emits_only_real_bytes() {
        let ctx = test_context();
        let ct = ciphertext(&ctx);

        // 5 bytes starting at offset 3: does not complete the block.
        let out = decrypt_chunk(&ctx, 3, &ct[3..8]).unwrap();
        assert_eq!(&out.head[..], &plaintext()[3..8]);
        assert!(out.tail.is_none());
        assert_eq!(out.next_offset, 8);

        // The stream resumes mid-block from where the last chunk ended.
        let rest = decrypt_chunk(&ctx, out.next_offset, &ct[8..16]).unwrap();
        assert_eq!(&rest.head[..], &plaintext()[8..16]);
    }

    #[test]
    fn test_misaligned_chunk_splits_head_and_tail() {
        let ctx = test_context();
        let ct = ciphertext(&ctx);

        let out = decrypt_chunk(&ctx, 10, &ct[10..40]).unwrap();
        // Head fills the first block (6 bytes), tail carries the rest.
        assert_eq!(out.head.len(), 6);
        assert_eq!(&out.head[..], &plaintext()[10..16]);
        let tail = out.tail.expect("chunk crossing a boundary yields a tail");
        assert_eq!(&tail[..], &plaintext()[16..40]);
        assert_eq!(out.next_offset, 40);
    }

    #[test]
    fn test_empty_chunk() {
        let ctx = test_context();
        let out = decrypt_chunk(&ctx, 0, &[]).unwrap();
        assert!(out.head.is_empty());
        assert!(out.tail.is_none());
        assert_eq!(out.next_offset, 0);
    }
}
