use super::{fail, read_input};
use cipherforge::alphabet::{Alphabet, ENGLISH};
use cipherforge::cipher;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct EncryptArgs {
    pub text: Option<String>,

    #[arg(short = 'f', long)]
    pub file: Option<String>,

    #[arg(short = 'K', long, required_unless_present = "random_key")]
    pub key: Option<String>,

    /// Generate a random key of this length instead
    #[arg(long, conflicts_with = "key")]
    pub random_key: Option<usize>,

    #[arg(short = 'S', long)]
    pub seed: Option<u64>,

    #[arg(short = 'a', long, default_value = ENGLISH)]
    pub alphabet: String,
}

#[derive(Args, Debug, Clone)]
pub struct DecryptArgs {
    pub text: Option<String>,

    #[arg(short = 'f', long)]
    pub file: Option<String>,

    #[arg(short = 'K', long)]
    pub key: String,

    #[arg(short = 'a', long, default_value = ENGLISH)]
    pub alphabet: String,
}

fn random_key(alphabet: &Alphabet, len: usize, seed: Option<u64>) -> String {
    let mut rng = match seed {
        Some(s) => fastrand::Rng::with_seed(s),
        None => fastrand::Rng::new(),
    };
    (0..len.max(1))
        .map(|_| alphabet.symbol(rng.usize(..alphabet.len())))
        .collect()
}

pub fn run_encrypt(args: EncryptArgs) {
    let alphabet = Alphabet::new(&args.alphabet).unwrap_or_else(|e| fail("Invalid alphabet", e));
    let text = read_input(args.text.as_deref(), args.file.as_deref());

    let key = match (&args.key, args.random_key) {
        (Some(k), _) => k.clone(),
        (None, Some(len)) => random_key(&alphabet, len, args.seed),
        (None, None) => fail("Missing key", "pass --key or --random-key <N>"),
    };

    let out = cipher::encrypt(&alphabet, &text, &key).unwrap_or_else(|e| fail("Encryption failed", e));
    println!("Key: {}", key.to_uppercase());
    println!("Ciphertext: {}", out);
}

pub fn run_decrypt(args: DecryptArgs) {
    let alphabet = Alphabet::new(&args.alphabet).unwrap_or_else(|e| fail("Invalid alphabet", e));
    let text = read_input(args.text.as_deref(), args.file.as_deref());
    let out = cipher::decrypt(&alphabet, &text, &args.key)
        .unwrap_or_else(|e| fail("Decryption failed", e));
    println!("Plaintext: {}", out);
}
