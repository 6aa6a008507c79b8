//! SHA-0 digest.
//!
//! SHA-0 is broken and not shipped by any maintained hash crate, but Atmos still
//! reports `SHA0` checksums for objects, so we carry a small implementation here.
//! It is SHA-1 without the one-bit rotation in the message schedule.

const H0: [u32; 5] = [0x67452301, 0xEFCDAB89, 0x98BADCFE, 0x10325476, 0xC3D2E1F0];

/// Streaming SHA-0 state.
#[derive(Clone)]
pub struct Sha0 {
    state: [u32; 5],
    block: [u8; 64],
    block_len: usize,
    total_len: u64,
}

impl Default for Sha0 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha0 {
    /// Create a fresh digest.
    pub fn new() -> Self {
        Self {
            state: H0,
            block: [0; 64],
            block_len: 0,
            total_len: 0,
        }
    }

    /// Feed more bytes.
    pub fn update(&mut self, mut data: &[u8]) {
        self.total_len = self.total_len.wrapping_add(data.len() as u64);

        if self.block_len > 0 {
            let n = (64 - self.block_len).min(data.len());
            self.block[self.block_len..self.block_len + n].copy_from_slice(&data[..n]);
            self.block_len += n;
            data = &data[n..];
            if self.block_len < 64 {
                return;
            }
            let block = self.block;
            compress(&mut self.state, &block);
            self.block_len = 0;
        }

        while data.len() >= 64 {
            let (head, tail) = data.split_at(64);
            let mut block = [0u8; 64];
            block.copy_from_slice(head);
            compress(&mut self.state, &block);
            data = tail;
        }

        self.block[..data.len()].copy_from_slice(data);
        self.block_len = data.len();
    }

    /// Consume the state and return the 20 byte digest.
    pub fn finalize(mut self) -> [u8; 20] {
        let bit_len = self.total_len.wrapping_mul(8);

        let mut pad = [0u8; 72];
        pad[0] = 0x80;
        let pad_len = if self.block_len < 56 {
            56 - self.block_len
        } else {
            120 - self.block_len
        };
        // total_len must not include padding
        let total = self.total_len;
        self.update(&pad[..pad_len]);
        self.update(&bit_len.to_be_bytes());
        self.total_len = total;

        let mut out = [0u8; 20];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.state.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }
}

fn compress(state: &mut [u32; 5], block: &[u8; 64]) {
    let mut w = [0u32; 80];
    for (i, chunk) in block.chunks_exact(4).enumerate() {
        w[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for t in 16..80 {
        w[t] = w[t - 3] ^ w[t - 8] ^ w[t - 14] ^ w[t - 16];
    }

    let [mut a, mut b, mut c, mut d, mut e] = *state;
    for (t, wt) in w.iter().enumerate() {
        let (f, k) = match t {
            0..=19 => ((b & c) | (!b & d), 0x5A827999),
            20..=39 => (b ^ c ^ d, 0x6ED9EBA1),
            40..=59 => ((b & c) | (b & d) | (c & d), 0x8F1BBCDC),
            _ => (b ^ c ^ d, 0xCA62C1D6),
        };
        let tmp = a
            .rotate_left(5)
            .wrapping_add(f)
            .wrapping_add(e)
            .wrapping_add(k)
            .wrapping_add(*wt);
        e = d;
        d = c;
        c = b.rotate_left(30);
        b = a;
        a = tmp;
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(b"", "f96cea198ad1dd5617ac084a3d92c6107708c0ef"; "empty")]
    #[test_case(b"abc", "0164b8a914cd2a5e74c4f7ff082c4d97f1edf880"; "abc")]
    #[test_case(b"hello world", "9fce82c34887c1953b40b3a2883e18850c4fa8a6"; "hello world")]
    fn test_sha0(input: &[u8], expected: &str) {
        let mut h = Sha0::new();
        h.update(input);
        assert_eq!(hex::encode(h.finalize()), expected);
    }

    #[test]
    fn test_sha0_split_updates() {
        let data = vec![b'a'; 1000];
        let mut h = Sha0::new();
        for chunk in data.chunks(37) {
            h.update(chunk);
        }
        assert_eq!(
            hex::encode(h.finalize()),
            "8a14112b4ba0c9544d50e2b7d06cdcbbf122824c"
        );
    }
}
